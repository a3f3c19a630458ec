//! Edge-triggered bindings from polled conditions to scheduler actions
//!
//! Triggers hold no claim on subsystems. They only feed the scheduler's
//! normal schedule and cancel queues.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::CommandHandle;
use crate::error::Result;
use crate::scheduler::Scheduler;

static NEXT_TRIGGER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId(u64);

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger-{}", self.0)
    }
}

/// Transition of the condition between two polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

type Action = Box<dyn FnMut(&mut Scheduler) -> Result<()>>;

enum Binding {
    Schedule { edge: Edge, command: CommandHandle },
    Cancel { edge: Edge, command: CommandHandle },
    Toggle { command: CommandHandle },
    Custom { edge: Edge, action: Action },
}

impl Binding {
    fn fire(&mut self, edge: Edge, scheduler: &mut Scheduler) -> Result<()> {
        match self {
            Self::Schedule { edge: on, command } if *on == edge => scheduler.schedule(command),
            Self::Cancel { edge: on, command } if *on == edge => {
                scheduler.cancel(command);
                Ok(())
            }
            Self::Toggle { command } if edge == Edge::Rising => {
                if scheduler.is_scheduled(command) {
                    scheduler.cancel(command);
                    Ok(())
                } else {
                    scheduler.schedule(command)
                }
            }
            Self::Custom { edge: on, action } if *on == edge => action(scheduler),
            _ => Ok(()),
        }
    }
}

/// A boolean condition polled once per cycle
///
/// The condition is treated as false before the first poll, so a condition
/// that starts out true fires its rising-edge bindings on the first poll.
pub struct Trigger {
    id: TriggerId,
    condition: Box<dyn FnMut() -> bool>,
    previous: bool,
    bindings: Vec<Binding>,
}

impl Trigger {
    pub fn new(condition: impl FnMut() -> bool + 'static) -> Self {
        Self {
            id: TriggerId(NEXT_TRIGGER_ID.fetch_add(1, Ordering::Relaxed)),
            condition: Box::new(condition),
            previous: false,
            bindings: Vec::new(),
        }
    }

    pub fn id(&self) -> TriggerId {
        self.id
    }

    /// Schedule on the rising edge
    pub fn on_true(mut self, command: &CommandHandle) -> Self {
        self.bindings.push(Binding::Schedule {
            edge: Edge::Rising,
            command: command.clone(),
        });
        self
    }

    /// Schedule on the falling edge
    pub fn on_false(mut self, command: &CommandHandle) -> Self {
        self.bindings.push(Binding::Schedule {
            edge: Edge::Falling,
            command: command.clone(),
        });
        self
    }

    /// Schedule on the rising edge, cancel on the falling edge
    pub fn while_true(mut self, command: &CommandHandle) -> Self {
        self.bindings.push(Binding::Schedule {
            edge: Edge::Rising,
            command: command.clone(),
        });
        self.bindings.push(Binding::Cancel {
            edge: Edge::Falling,
            command: command.clone(),
        });
        self
    }

    /// Alternately schedule and cancel on each rising edge
    pub fn toggle_on_true(mut self, command: &CommandHandle) -> Self {
        self.bindings.push(Binding::Toggle {
            command: command.clone(),
        });
        self
    }

    /// Run an arbitrary action on the given edge
    pub fn on_edge(mut self, edge: Edge, action: impl FnMut(&mut Scheduler) -> Result<()> + 'static) -> Self {
        self.bindings.push(Binding::Custom {
            edge,
            action: Box::new(action),
        });
        self
    }

    /// Evaluate the condition and fire the bindings for any edge
    pub fn poll(&mut self, scheduler: &mut Scheduler) -> Result<()> {
        let current = (self.condition)();
        let edge = match (self.previous, current) {
            (false, true) => Edge::Rising,
            (true, false) => Edge::Falling,
            _ => return Ok(()),
        };
        self.previous = current;

        for binding in &mut self.bindings {
            binding.fire(edge, scheduler)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("previous", &self.previous)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LambdaCommand;
    use crate::run_state::RunState;
    use std::cell::Cell;
    use std::rc::Rc;

    fn held() -> CommandHandle {
        CommandHandle::new(LambdaCommand::new().finish_when(|| false))
    }

    fn input() -> (Rc<Cell<bool>>, impl FnMut() -> bool + 'static) {
        let state = Rc::new(Cell::new(false));
        let reader = state.clone();
        (state, move || reader.get())
    }

    #[test]
    fn test_on_true_fires_once_per_rising_edge() {
        let (button, condition) = input();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let mut trigger = Trigger::new(condition).on_edge(Edge::Rising, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        let mut scheduler = Scheduler::default();

        trigger.poll(&mut scheduler).unwrap();
        button.set(true);
        trigger.poll(&mut scheduler).unwrap();
        trigger.poll(&mut scheduler).unwrap();
        button.set(false);
        trigger.poll(&mut scheduler).unwrap();
        button.set(true);
        trigger.poll(&mut scheduler).unwrap();

        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_while_true_schedules_then_cancels() {
        let (button, condition) = input();
        let command = held();
        let mut scheduler = Scheduler::default();
        scheduler.register_trigger(Trigger::new(condition).while_true(&command));

        button.set(true);
        scheduler.cycle(RunState::Loop).unwrap();
        assert!(scheduler.is_scheduled(&command));

        button.set(false);
        scheduler.cycle(RunState::Loop).unwrap();
        assert!(!scheduler.is_scheduled(&command));
    }

    #[test]
    fn test_toggle_alternates() {
        let (button, condition) = input();
        let command = held();
        let mut scheduler = Scheduler::default();
        scheduler.register_trigger(Trigger::new(condition).toggle_on_true(&command));

        for expected in [true, false, true] {
            button.set(true);
            scheduler.cycle(RunState::Loop).unwrap();
            button.set(false);
            scheduler.cycle(RunState::Loop).unwrap();
            assert_eq!(scheduler.is_scheduled(&command), expected);
        }
    }

    #[test]
    fn test_on_false_fires_on_release() {
        let (button, condition) = input();
        let command = held();
        let mut scheduler = Scheduler::default();
        scheduler.register_trigger(Trigger::new(condition).on_false(&command));

        button.set(true);
        scheduler.cycle(RunState::Loop).unwrap();
        assert!(!scheduler.is_scheduled(&command));

        button.set(false);
        scheduler.cycle(RunState::Loop).unwrap();
        assert!(scheduler.is_scheduled(&command));
    }

    #[test]
    fn test_deregistered_trigger_stops_firing() {
        let (button, condition) = input();
        let command = held();
        let mut scheduler = Scheduler::default();
        let id = scheduler.register_trigger(Trigger::new(condition).on_true(&command));

        assert!(scheduler.deregister_trigger(id));
        assert_eq!(scheduler.trigger_count(), 0);

        button.set(true);
        scheduler.cycle(RunState::Loop).unwrap();
        assert!(!scheduler.is_scheduled(&command));
    }

    #[test]
    fn test_action_can_deregister_its_own_trigger() {
        let (button, condition) = input();
        let own_id = Rc::new(Cell::new(None));
        let id_reader = own_id.clone();
        let removed = Rc::new(Cell::new(false));
        let removed_writer = removed.clone();
        let mut scheduler = Scheduler::default();
        let id = scheduler.register_trigger(Trigger::new(condition).on_edge(Edge::Rising, move |s| {
            if let Some(id) = id_reader.get() {
                removed_writer.set(s.deregister_trigger(id));
            }
            Ok(())
        }));
        own_id.set(Some(id));

        button.set(true);
        scheduler.poll_triggers().unwrap();
        assert!(removed.get());
        assert_eq!(scheduler.trigger_count(), 0);
        assert!(!scheduler.deregister_trigger(id));
    }
}
