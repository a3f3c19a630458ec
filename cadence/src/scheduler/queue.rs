//! Queue types for the scheduler

use crate::command::{CommandHandle, CommandId};

/// Outcome of one attempt to move a command to Running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Requirements were free; command is running
    Initialised,

    /// Command is running; interruptible holders were queued for cancellation
    Preempted { displaced: usize },

    /// Command was already running
    AlreadyRunning,

    /// Current run state is not one of the command's run states
    Ineligible,

    /// A non-interruptible holder owns one of the requirements
    Blocked { holder: CommandId },
}

/// Insertion-ordered, identity-deduplicated command queue
///
/// Order decides which of two requests wins an idle subsystem when both are
/// drained in the same pass.
#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: Vec<CommandHandle>,
}

impl CommandQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append unless already queued; returns whether it was added
    pub fn push(&mut self, command: CommandHandle) -> bool {
        if self.contains(&command) {
            return false;
        }
        self.entries.push(command);
        true
    }

    pub fn contains(&self, command: &CommandHandle) -> bool {
        self.entries.iter().any(|c| c == command)
    }

    /// Take every queued command, leaving the queue empty
    pub fn drain(&mut self) -> Vec<CommandHandle> {
        std::mem::take(&mut self.entries)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub total_initialised: u64,
    pub total_finished: u64,
    pub total_interrupted: u64,
    pub total_blocked: u64,
    pub total_ineligible: u64,
    pub peak_running: usize,
}

impl SchedulerStats {
    pub(crate) fn record(&mut self, outcome: AttemptOutcome, running: usize) {
        match outcome {
            AttemptOutcome::Initialised | AttemptOutcome::Preempted { .. } => {
                self.total_initialised += 1;
                self.peak_running = self.peak_running.max(running);
            }
            AttemptOutcome::Blocked { .. } => self.total_blocked += 1,
            AttemptOutcome::Ineligible => self.total_ineligible += 1,
            AttemptOutcome::AlreadyRunning => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LambdaCommand;

    fn command(name: &str) -> CommandHandle {
        CommandHandle::new(LambdaCommand::new().named(name))
    }

    #[test]
    fn test_queue_preserves_insertion_order() {
        let (a, b, c) = (command("a"), command("b"), command("c"));
        let mut queue = CommandQueue::with_capacity(4);
        queue.push(b.clone());
        queue.push(a.clone());
        queue.push(c.clone());

        assert_eq!(queue.drain(), vec![b, a, c]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_deduplicates_by_identity() {
        let a = command("same");
        let b = command("same");
        let mut queue = CommandQueue::default();

        assert!(queue.push(a.clone()));
        assert!(!queue.push(a.clone()));
        assert!(queue.push(b));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = SchedulerStats::default();
        stats.record(AttemptOutcome::Initialised, 1);
        stats.record(AttemptOutcome::Preempted { displaced: 1 }, 3);
        stats.record(AttemptOutcome::Ineligible, 3);
        stats.record(AttemptOutcome::AlreadyRunning, 3);

        assert_eq!(stats.total_initialised, 2);
        assert_eq!(stats.total_ineligible, 1);
        assert_eq!(stats.total_blocked, 0);
        assert_eq!(stats.peak_running, 3);
    }
}
