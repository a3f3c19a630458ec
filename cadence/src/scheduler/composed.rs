//! Registry of commands that have been folded into a composite
//!
//! Entries hold weak handles only. A composed command stays registered while
//! anything else keeps it alive and is pruned once the last strong handle
//! (normally the owning composite) is dropped.

use std::collections::HashMap;

use tracing::debug;

use crate::command::{CommandHandle, CommandId, WeakCommandHandle};
use crate::error::{Result, SchedulerError};

#[derive(Debug, Default)]
pub struct ComposedRegistry {
    entries: HashMap<CommandId, WeakCommandHandle>,
}

impl ComposedRegistry {
    pub fn contains(&self, command: &CommandHandle) -> bool {
        self.entries.get(&command.id()).is_some_and(WeakCommandHandle::is_alive)
    }

    /// Fail if any of the given commands is already composed
    pub fn require_not_composed<'a>(&self, commands: impl IntoIterator<Item = &'a CommandHandle>) -> Result<()> {
        match commands.into_iter().find(|c| self.contains(c)) {
            Some(command) => Err(SchedulerError::AlreadyComposed {
                command: command.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Mark commands as composed; adds nothing if any already is
    pub fn register(&mut self, commands: &[CommandHandle]) -> Result<()> {
        self.require_not_composed(commands)?;
        self.prune();
        for command in commands {
            debug!(command = %command, "ComposedRegistry::register: composed");
            self.entries.insert(command.id(), command.downgrade());
        }
        Ok(())
    }

    /// Live entries
    pub fn len(&self) -> usize {
        self.entries.values().filter(|w| w.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&mut self) {
        self.entries.retain(|_, weak| weak.is_alive());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LambdaCommand;

    fn command() -> CommandHandle {
        CommandHandle::new(LambdaCommand::new())
    }

    #[test]
    fn test_register_and_contains() {
        let (a, b) = (command(), command());
        let mut registry = ComposedRegistry::default();

        registry.register(&[a.clone()]).unwrap();
        assert!(registry.contains(&a));
        assert!(!registry.contains(&b));
    }

    #[test]
    fn test_register_is_all_or_nothing() {
        let (a, b) = (command(), command());
        let mut registry = ComposedRegistry::default();
        registry.register(&[a.clone()]).unwrap();

        let err = registry.register(&[b.clone(), a.clone()]).unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyComposed { .. }));
        assert!(!registry.contains(&b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_require_not_composed() {
        let (a, b) = (command(), command());
        let mut registry = ComposedRegistry::default();
        registry.register(&[a.clone()]).unwrap();

        assert!(registry.require_not_composed([&b]).is_ok());
        assert!(registry.require_not_composed([&b, &a]).is_err());
    }

    #[test]
    fn test_dropped_commands_are_pruned() {
        let mut registry = ComposedRegistry::default();
        registry.register(&[command(), command()]).unwrap();
        assert_eq!(registry.len(), 0);

        let kept = command();
        registry.register(&[kept.clone()]).unwrap();
        assert_eq!(registry.entries.len(), 1);
        assert!(registry.contains(&kept));
    }
}
