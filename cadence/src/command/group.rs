//! Composite commands
//!
//! A group owns its children and drives their lifecycle itself; the
//! scheduler only ever sees the group. Construction registers the children
//! as composed so they cannot also be scheduled directly.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Result, SchedulerError};
use crate::run_state::RunStates;
use crate::scheduler::Scheduler;

use super::{Command, CommandHandle, Requirements};

/// Metadata shared by every group kind
struct Composition {
    name: String,
    children: Vec<CommandHandle>,
    requirements: Requirements,
    run_states: RunStates,
    interruptible: bool,
}

impl Composition {
    /// Validate the children and register them as composed
    fn register(scheduler: &mut Scheduler, kind: &str, children: Vec<CommandHandle>) -> Result<Self> {
        if let Some(running) = children.iter().find(|c| scheduler.is_scheduled(c)) {
            return Err(SchedulerError::InvalidComposition {
                reason: format!("{} child {} is already running", kind, running),
            });
        }
        let composition = Self::new(kind, children)?;
        scheduler.register_composed(&composition.children)?;
        Ok(composition)
    }

    fn new(kind: &str, children: Vec<CommandHandle>) -> Result<Self> {
        let mut ids = HashSet::new();
        if let Some(duplicate) = children.iter().find(|c| !ids.insert(c.id())) {
            return Err(SchedulerError::InvalidComposition {
                reason: format!("{} lists {} more than once", kind, duplicate),
            });
        }
        let run_states = children
            .iter()
            .fold(RunStates::all(), |acc, c| acc.intersection(c.run_states()));
        if run_states.is_empty() {
            return Err(SchedulerError::InvalidComposition {
                reason: format!("{} children share no run state", kind),
            });
        }
        let names: Vec<&str> = children.iter().map(|c| c.name()).collect();
        Ok(Self {
            name: format!("{}[{}]", kind, names.join(", ")),
            requirements: children.iter().flat_map(|c| c.required_subsystems()).collect(),
            interruptible: children.iter().all(|c| c.interruptible()),
            run_states,
            children,
        })
    }
}

/// Runs its children one after another
///
/// Requirements are the union of the children's, held for the whole group.
pub struct SequentialGroup {
    composition: Composition,
    current: Option<usize>,
}

impl SequentialGroup {
    pub fn new(scheduler: &mut Scheduler, children: Vec<CommandHandle>) -> Result<CommandHandle> {
        let composition = Composition::register(scheduler, "Sequential", children)?;
        debug!(name = %composition.name, "SequentialGroup::new: composed");
        Ok(CommandHandle::new(Self {
            composition,
            current: None,
        }))
    }

    fn start(&mut self, index: usize) {
        self.current = None;
        if let Some(child) = self.composition.children.get(index) {
            child.initialise();
            self.current = Some(index);
        }
    }
}

impl Command for SequentialGroup {
    fn initialise(&mut self) {
        self.start(0);
    }

    fn execute(&mut self) {
        let Some(index) = self.current else {
            return;
        };
        let child = &self.composition.children[index];
        child.execute();
        if child.finished() {
            child.end(false);
            self.start(index + 1);
        }
    }

    fn finished(&mut self) -> bool {
        self.current.is_none()
    }

    fn end(&mut self, interrupted: bool) {
        if let Some(index) = self.current.take() {
            self.composition.children[index].end(interrupted);
        }
    }

    fn required_subsystems(&self) -> Requirements {
        self.composition.requirements.clone()
    }

    fn run_states(&self) -> RunStates {
        self.composition.run_states
    }

    fn interruptible(&self) -> bool {
        self.composition.interruptible
    }

    fn name(&self) -> &str {
        &self.composition.name
    }
}

/// When a parallel group is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelMode {
    /// Every child has finished
    All,
    /// Any child has finished; the rest are interrupted
    Race,
}

/// Runs its children side by side
///
/// Children must not share subsystems.
pub struct ParallelGroup {
    composition: Composition,
    mode: ParallelMode,
    active: Vec<bool>,
    any_finished: bool,
}

impl ParallelGroup {
    pub fn new(scheduler: &mut Scheduler, mode: ParallelMode, children: Vec<CommandHandle>) -> Result<CommandHandle> {
        let mut seen = Requirements::new();
        for child in &children {
            for subsystem in child.required_subsystems() {
                if !seen.insert(subsystem) {
                    return Err(SchedulerError::InvalidComposition {
                        reason: format!("parallel children both require {}", subsystem),
                    });
                }
            }
        }
        let kind = match mode {
            ParallelMode::All => "Parallel",
            ParallelMode::Race => "Race",
        };
        let composition = Composition::register(scheduler, kind, children)?;
        debug!(name = %composition.name, "ParallelGroup::new: composed");
        Ok(CommandHandle::new(Self {
            active: vec![false; composition.children.len()],
            composition,
            mode,
            any_finished: false,
        }))
    }
}

impl Command for ParallelGroup {
    fn initialise(&mut self) {
        self.any_finished = false;
        for (child, active) in self.composition.children.iter().zip(self.active.iter_mut()) {
            child.initialise();
            *active = true;
        }
    }

    fn execute(&mut self) {
        for (child, active) in self.composition.children.iter().zip(self.active.iter_mut()) {
            if !*active {
                continue;
            }
            child.execute();
            if child.finished() {
                child.end(false);
                *active = false;
                self.any_finished = true;
            }
        }
    }

    fn finished(&mut self) -> bool {
        match self.mode {
            ParallelMode::All => !self.active.contains(&true),
            ParallelMode::Race => self.any_finished || self.active.is_empty(),
        }
    }

    fn end(&mut self, _interrupted: bool) {
        // Whatever is still running lost the race or was cut short
        for (child, active) in self.composition.children.iter().zip(self.active.iter_mut()) {
            if *active {
                child.end(true);
                *active = false;
            }
        }
    }

    fn required_subsystems(&self) -> Requirements {
        self.composition.requirements.clone()
    }

    fn run_states(&self) -> RunStates {
        self.composition.run_states
    }

    fn interruptible(&self) -> bool {
        self.composition.interruptible
    }

    fn name(&self) -> &str {
        &self.composition.name
    }
}
