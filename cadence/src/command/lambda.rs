//! Closure-backed commands

use crate::run_state::RunStates;
use crate::subsystem::{SubsystemHandle, SubsystemId};

use super::{Command, Requirements};

/// A command assembled from closures
///
/// Defaults: no requirements, no-op callbacks, finishes on its first poll
/// (one-shot), interruptible, valid in the active loop.
///
/// ```ignore
/// let drive_forward = LambdaCommand::new()
///     .named("DriveForward")
///     .requires(&drive)
///     .on_execute(move || drivetrain.borrow_mut().set_power(0.5))
///     .finish_when(|| false)
///     .on_end(move |_| stop.borrow_mut().set_power(0.0));
/// scheduler.schedule(&CommandHandle::new(drive_forward))?;
/// ```
pub struct LambdaCommand {
    name: String,
    requirements: Requirements,
    run_states: RunStates,
    interruptible: bool,
    on_init: Box<dyn FnMut()>,
    on_execute: Box<dyn FnMut()>,
    finish_when: Box<dyn FnMut() -> bool>,
    on_end: Box<dyn FnMut(bool)>,
}

impl Default for LambdaCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl LambdaCommand {
    pub fn new() -> Self {
        Self {
            name: "LambdaCommand".to_string(),
            requirements: Requirements::new(),
            run_states: RunStates::loop_only(),
            interruptible: true,
            on_init: Box::new(|| {}),
            on_execute: Box::new(|| {}),
            finish_when: Box::new(|| true),
            on_end: Box::new(|_| {}),
        }
    }

    /// A command that does nothing and never finishes
    ///
    /// Useful as a placeholder default command that keeps a subsystem
    /// claimed without driving it.
    pub fn idle(subsystem: &SubsystemHandle) -> Self {
        Self::new()
            .named(format!("{}Idle", subsystem.name()))
            .requires(subsystem)
            .run_states(RunStates::all())
            .finish_when(|| false)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn requires(self, subsystem: &SubsystemHandle) -> Self {
        self.requires_id(subsystem.id())
    }

    pub fn requires_id(mut self, subsystem: SubsystemId) -> Self {
        self.requirements.insert(subsystem);
        self
    }

    pub fn run_states(mut self, run_states: RunStates) -> Self {
        self.run_states = run_states;
        self
    }

    pub fn interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    pub fn on_init(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_init = Box::new(f);
        self
    }

    pub fn on_execute(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_execute = Box::new(f);
        self
    }

    pub fn finish_when(mut self, f: impl FnMut() -> bool + 'static) -> Self {
        self.finish_when = Box::new(f);
        self
    }

    pub fn on_end(mut self, f: impl FnMut(bool) + 'static) -> Self {
        self.on_end = Box::new(f);
        self
    }
}

impl Command for LambdaCommand {
    fn initialise(&mut self) {
        (self.on_init)();
    }

    fn execute(&mut self) {
        (self.on_execute)();
    }

    fn finished(&mut self) -> bool {
        (self.finish_when)()
    }

    fn end(&mut self, interrupted: bool) {
        (self.on_end)(interrupted);
    }

    fn required_subsystems(&self) -> Requirements {
        self.requirements.clone()
    }

    fn run_states(&self) -> RunStates {
        self.run_states
    }

    fn interruptible(&self) -> bool {
        self.interruptible
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandHandle;
    use crate::run_state::RunState;
    use crate::subsystem::Subsystem;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Claw;

    impl Subsystem for Claw {}

    #[test]
    fn test_defaults_are_one_shot() {
        let mut command = LambdaCommand::new();
        assert!(command.finished());
        assert!(Command::interruptible(&command));
        assert!(command.required_subsystems().is_empty());
        assert_eq!(Command::run_states(&command), RunStates::loop_only());
    }

    #[test]
    fn test_builder_sets_metadata() {
        let claw = SubsystemHandle::new(Claw);
        let command = LambdaCommand::new()
            .named("Grab")
            .requires(&claw)
            .interruptible(false)
            .run_states(RunStates::polled());

        let handle = CommandHandle::new(command);
        assert_eq!(handle.name(), "Grab");
        assert!(handle.required_subsystems().contains(&claw.id()));
        assert!(!handle.interruptible());
        assert!(handle.run_states().contains(RunState::InitLoop));
    }

    #[test]
    fn test_callbacks_run() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let mut command = LambdaCommand::new()
            .on_init(move || l1.borrow_mut().push("init".to_string()))
            .on_execute(move || l2.borrow_mut().push("execute".to_string()))
            .on_end(move |interrupted| l3.borrow_mut().push(format!("end({})", interrupted)));

        command.initialise();
        command.execute();
        command.end(true);

        assert_eq!(*log.borrow(), vec!["init", "execute", "end(true)"]);
    }

    #[test]
    fn test_idle_never_finishes() {
        let claw = SubsystemHandle::new(Claw);
        let mut idle = LambdaCommand::idle(&claw);
        assert!(!idle.finished());
        assert_eq!(idle.name(), "ClawIdle");
        assert_eq!(idle.required_subsystems().len(), 1);
        assert_eq!(Command::run_states(&idle), RunStates::all());
    }
}
