//! Commands: units of work that claim subsystems while they run
//!
//! ## Lifecycle
//!
//! 1. `initialise()` - once, when the scheduler moves the command to Running
//! 2. `finished()` - polled once per cycle before `execute()`
//! 3. `execute()` - once per cycle while Running
//! 4. `end(interrupted)` - once, on any exit from Running
//!
//! Every `initialise()` is matched by exactly one `end()`. Commands are
//! identified by their handle; two handles to commands with identical
//! behavior are still distinct.

mod group;
mod lambda;

pub use group::{ParallelGroup, ParallelMode, SequentialGroup};
pub use lambda::LambdaCommand;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::run_state::RunStates;
use crate::subsystem::SubsystemId;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Subsystems a command claims while running
pub type Requirements = BTreeSet<SubsystemId>;

/// Process-unique command identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command-{}", self.0)
    }
}

/// Command capability
///
/// Callbacks are infallible. A command that fails internally should report
/// it by returning true from `finished()` and cleaning up in `end()`.
pub trait Command {
    fn initialise(&mut self) {}

    fn execute(&mut self) {}

    fn finished(&mut self) -> bool {
        false
    }

    fn end(&mut self, _interrupted: bool) {}

    fn required_subsystems(&self) -> Requirements {
        Requirements::new()
    }

    fn run_states(&self) -> RunStates {
        RunStates::loop_only()
    }

    /// Whether a newly scheduled command may take this command's subsystems
    fn interruptible(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>().rsplit("::").next().unwrap_or("command")
    }
}

/// Shared handle to a command
#[derive(Clone)]
pub struct CommandHandle {
    id: CommandId,
    name: Rc<str>,
    inner: Rc<RefCell<dyn Command>>,
}

impl CommandHandle {
    pub fn new<C: Command + 'static>(command: C) -> Self {
        let name: Rc<str> = Rc::from(command.name());
        let inner: Rc<RefCell<dyn Command>> = Rc::new(RefCell::new(command));
        Self {
            id: CommandId::next(),
            name,
            inner,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_subsystems(&self) -> Requirements {
        self.inner.borrow().required_subsystems()
    }

    pub fn run_states(&self) -> RunStates {
        self.inner.borrow().run_states()
    }

    pub fn interruptible(&self) -> bool {
        self.inner.borrow().interruptible()
    }

    pub fn downgrade(&self) -> WeakCommandHandle {
        WeakCommandHandle {
            id: self.id,
            inner: Rc::downgrade(&self.inner),
        }
    }

    // Lifecycle calls are reserved for the scheduler and composite commands
    // so that initialise/end stay balanced.

    pub(crate) fn initialise(&self) {
        self.inner.borrow_mut().initialise();
    }

    pub(crate) fn execute(&self) {
        self.inner.borrow_mut().execute();
    }

    pub(crate) fn finished(&self) -> bool {
        self.inner.borrow_mut().finished()
    }

    pub(crate) fn end(&self, interrupted: bool) {
        self.inner.borrow_mut().end(interrupted);
    }
}

impl PartialEq for CommandHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandHandle {}

impl std::hash::Hash for CommandHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

impl fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

/// Non-owning reference to a command
#[derive(Clone)]
pub struct WeakCommandHandle {
    id: CommandId,
    inner: Weak<RefCell<dyn Command>>,
}

impl WeakCommandHandle {
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// True while some strong handle to the command still exists
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakCommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weak({})", self.id)
    }
}
