//! Scheduler implementation

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::command::{CommandHandle, CommandId};
use crate::error::{Result, SchedulerError};
use crate::run_state::RunState;
use crate::subsystem::{SubsystemHandle, SubsystemId};
use crate::trigger::{Trigger, TriggerId};

use super::composed::ComposedRegistry;
use super::config::SchedulerConfig;
use super::queue::{AttemptOutcome, CommandQueue, SchedulerStats};

/// The Scheduler arbitrates exclusive subsystem access among commands,
/// one arbitration pass per control cycle.
///
/// It is owned by the host and passed explicitly to whatever needs it.
/// Handles are `Rc`-based, so a scheduler never leaves the control thread.
pub struct Scheduler {
    config: SchedulerConfig,

    /// Registered subsystems, in registration order
    subsystems: Vec<SubsystemHandle>,

    default_commands: HashMap<SubsystemId, CommandHandle>,

    triggers: Vec<Trigger>,

    /// Triggers taken out of `triggers` by an in-progress `poll_triggers`
    polling_triggers: Vec<TriggerId>,

    /// Deregistrations requested while the triggers were being polled
    pending_trigger_removals: Vec<TriggerId>,

    /// Running commands, in the order they were initialised
    running: Vec<CommandHandle>,

    /// Subsystem -> the one running command claiming it
    requirements: BTreeMap<SubsystemId, CommandHandle>,

    to_schedule: CommandQueue,
    to_cancel: CommandQueue,

    composed: ComposedRegistry,

    /// Name-keyed handoff of live subsystems between host phases
    stored: HashMap<String, SubsystemHandle>,

    /// Run state of the cycle being polled
    run_state: RunState,

    stats: SchedulerStats,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    /// Create a new scheduler with the given configuration
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self {
            to_schedule: CommandQueue::with_capacity(config.queue_capacity),
            to_cancel: CommandQueue::with_capacity(config.queue_capacity),
            config,
            subsystems: Vec::new(),
            default_commands: HashMap::new(),
            triggers: Vec::new(),
            polling_triggers: Vec::new(),
            pending_trigger_removals: Vec::new(),
            running: Vec::new(),
            requirements: BTreeMap::new(),
            composed: ComposedRegistry::default(),
            stored: HashMap::new(),
            run_state: RunState::default(),
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Subsystems
    // ------------------------------------------------------------------

    /// Register a subsystem, running its `init()` the first time
    pub fn register_subsystem(&mut self, subsystem: &SubsystemHandle) {
        if self.subsystems.contains(subsystem) {
            debug!(subsystem = ?subsystem, "Scheduler::register_subsystem: already registered");
            return;
        }
        subsystem.init();
        self.subsystems.push(subsystem.clone());
        info!(subsystem = ?subsystem, "Registered subsystem");
    }

    /// Remove a subsystem and its default command mapping
    ///
    /// A running command holding the subsystem keeps its claim until it ends.
    pub fn deregister_subsystem(&mut self, subsystem: &SubsystemHandle) -> bool {
        let before = self.subsystems.len();
        self.subsystems.retain(|s| s != subsystem);
        self.default_commands.remove(&subsystem.id());
        before != self.subsystems.len()
    }

    pub fn subsystems(&self) -> &[SubsystemHandle] {
        &self.subsystems
    }

    /// Set the command a subsystem runs whenever nothing else claims it
    ///
    /// The command must require exactly this subsystem, or nothing at all.
    pub fn set_default_command(&mut self, subsystem: &SubsystemHandle, command: &CommandHandle) -> Result<()> {
        if !self.subsystems.contains(subsystem) {
            return Err(SchedulerError::UnknownSubsystem {
                subsystem: format!("{:?}", subsystem),
            });
        }
        let required = command.required_subsystems();
        let valid = required.is_empty() || (required.len() == 1 && required.contains(&subsystem.id()));
        if !valid {
            return Err(SchedulerError::InvalidDefaultCommand {
                subsystem: format!("{:?}", subsystem),
                command: command.to_string(),
            });
        }
        self.composed.require_not_composed([command])?;
        self.default_commands.insert(subsystem.id(), command.clone());
        Ok(())
    }

    pub fn default_command(&self, subsystem: &SubsystemHandle) -> Option<&CommandHandle> {
        self.default_commands.get(&subsystem.id())
    }

    /// Call `periodic()` on every registered subsystem
    pub fn poll_subsystems_periodic(&mut self) {
        for subsystem in &self.subsystems {
            subsystem.periodic();
        }
    }

    /// True if the subsystem is claimed by something other than its default command
    pub fn is_busy(&self, subsystem: &SubsystemHandle) -> bool {
        match self.requirements.get(&subsystem.id()) {
            Some(holder) => self.default_commands.get(&subsystem.id()) != Some(holder),
            None => false,
        }
    }

    /// The command currently claiming a subsystem
    pub fn claimant(&self, subsystem: SubsystemId) -> Option<&CommandHandle> {
        self.requirements.get(&subsystem)
    }

    /// Snapshot of the requirement map
    pub fn requirements(&self) -> Vec<(SubsystemId, CommandId)> {
        self.requirements.iter().map(|(s, c)| (*s, c.id())).collect()
    }

    pub fn store_subsystem(&mut self, name: impl Into<String>, subsystem: SubsystemHandle) {
        self.stored.insert(name.into(), subsystem);
    }

    /// Remove and return a stored subsystem; `None` for names never stored
    pub fn take_stored_subsystem(&mut self, name: &str) -> Option<SubsystemHandle> {
        self.stored.remove(name)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Queue a command for the next `poll`
    ///
    /// Fails without queueing if the command has been composed.
    pub fn schedule(&mut self, command: &CommandHandle) -> Result<()> {
        if let Err(e) = self.composed.require_not_composed([command]) {
            warn!(command = %command, "Scheduler::schedule: rejected composed command");
            return Err(e);
        }
        self.to_schedule.push(command.clone());
        Ok(())
    }

    /// Queue a running command for interruption in the next `poll`
    pub fn cancel(&mut self, command: &CommandHandle) {
        self.to_cancel.push(command.clone());
    }

    pub fn is_scheduled(&self, command: &CommandHandle) -> bool {
        self.running.contains(command)
    }

    /// Running commands, in initialisation order
    pub fn running(&self) -> &[CommandHandle] {
        &self.running
    }

    pub fn register_composed(&mut self, commands: &[CommandHandle]) -> Result<()> {
        self.composed.register(commands)
    }

    pub fn require_not_composed<'a>(&self, commands: impl IntoIterator<Item = &'a CommandHandle>) -> Result<()> {
        self.composed.require_not_composed(commands)
    }

    pub fn is_composed(&self, command: &CommandHandle) -> bool {
        self.composed.contains(command)
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    // ------------------------------------------------------------------
    // Triggers
    // ------------------------------------------------------------------

    pub fn register_trigger(&mut self, trigger: Trigger) -> TriggerId {
        let id = trigger.id();
        self.triggers.push(trigger);
        id
    }

    /// Remove a trigger; returns false if no such trigger is registered
    ///
    /// Called from a trigger action, the removal takes effect once the
    /// current `poll_triggers` pass finishes.
    pub fn deregister_trigger(&mut self, id: TriggerId) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.id() != id);
        if before != self.triggers.len() {
            return true;
        }
        if self.polling_triggers.contains(&id) && !self.pending_trigger_removals.contains(&id) {
            self.pending_trigger_removals.push(id);
            return true;
        }
        false
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Poll every trigger once, in registration order
    ///
    /// Stops at the first action that fails; triggers registered by actions
    /// are polled from the next call on.
    pub fn poll_triggers(&mut self) -> Result<()> {
        let mut triggers = std::mem::take(&mut self.triggers);
        self.polling_triggers = triggers.iter().map(Trigger::id).collect();
        let mut result = Ok(());
        for trigger in &mut triggers {
            result = trigger.poll(self);
            if result.is_err() {
                break;
            }
        }
        self.polling_triggers.clear();
        triggers.append(&mut self.triggers);
        let removed = std::mem::take(&mut self.pending_trigger_removals);
        triggers.retain(|t| !removed.contains(&t.id()));
        self.triggers = triggers;
        result
    }

    // ------------------------------------------------------------------
    // Arbitration
    // ------------------------------------------------------------------

    /// One host cycle: subsystem periodics, triggers, then `poll`
    pub fn cycle(&mut self, run_state: RunState) -> Result<()> {
        self.poll_subsystems_periodic();
        let triggered = self.poll_triggers();
        self.poll(run_state);
        triggered
    }

    /// Run one full arbitration pass and execute every running command
    pub fn poll(&mut self, run_state: RunState) {
        self.run_state = run_state;
        self.stats.cycles += 1;

        // Lifecycle sweep
        for command in self.running.clone() {
            if command.finished() {
                self.cancel_now(&command, false);
            } else if !command.run_states().contains(run_state) {
                self.cancel_now(&command, true);
            }
        }

        // Primary schedule pass
        for command in self.to_schedule.drain() {
            self.try_initialise(&command);
        }

        // Default-command backfill
        let idle: Vec<CommandHandle> = self
            .subsystems
            .iter()
            .filter(|s| !self.requirements.contains_key(&s.id()))
            .filter_map(|s| self.default_commands.get(&s.id()).cloned())
            .collect();
        for command in idle {
            self.to_schedule.push(command);
        }

        // Secondary schedule pass
        for command in self.to_schedule.drain() {
            self.try_initialise(&command);
        }

        // Displaced and manually cancelled commands end after their
        // replacements have initialised.
        for command in self.to_cancel.drain() {
            self.cancel_now(&command, true);
        }

        for command in self.running.clone() {
            command.execute();
        }
    }

    fn try_initialise(&mut self, command: &CommandHandle) -> AttemptOutcome {
        let outcome = self.arbitrate(command);
        self.stats.record(outcome, self.running.len());
        if self.config.logging_enabled {
            debug!(command = %command, ?outcome, run_state = %self.run_state, "Scheduler::try_initialise");
        }
        outcome
    }

    fn arbitrate(&mut self, command: &CommandHandle) -> AttemptOutcome {
        if self.is_scheduled(command) {
            return AttemptOutcome::AlreadyRunning;
        }
        if !command.run_states().contains(self.run_state) {
            return AttemptOutcome::Ineligible;
        }

        let required = command.required_subsystems();
        let mut holders: Vec<CommandHandle> = Vec::new();
        for holder in required.iter().filter_map(|s| self.requirements.get(s)) {
            if !holders.contains(holder) {
                holders.push(holder.clone());
            }
        }

        // Decide first: one non-interruptible holder aborts the whole attempt
        if let Some(holder) = holders.iter().find(|h| !h.interruptible()) {
            return AttemptOutcome::Blocked { holder: holder.id() };
        }

        let displaced = holders.len();
        for holder in holders {
            self.to_cancel.push(holder);
        }

        for subsystem in required {
            self.requirements.insert(subsystem, command.clone());
        }
        self.running.push(command.clone());
        command.initialise();

        if displaced == 0 {
            AttemptOutcome::Initialised
        } else {
            AttemptOutcome::Preempted { displaced }
        }
    }

    fn cancel_now(&mut self, command: &CommandHandle, interrupted: bool) {
        if !self.is_scheduled(command) {
            return;
        }
        command.end(interrupted);
        self.requirements.retain(|_, holder| holder != command);
        self.running.retain(|c| c != command);

        if interrupted {
            self.stats.total_interrupted += 1;
        } else {
            self.stats.total_finished += 1;
        }
        if self.config.logging_enabled {
            debug!(command = %command, interrupted, "Scheduler::cancel_now: ended");
        }
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    /// Interrupt every running command and drop per-phase state
    ///
    /// Registered subsystems, default commands, stored subsystems and the
    /// composed registry survive.
    pub fn end_phase(&mut self) {
        info!(running = self.running.len(), "Scheduler::end_phase: interrupting running commands");
        for command in self.running.clone() {
            self.cancel_now(&command, true);
        }
        self.to_schedule.clear();
        self.to_cancel.clear();
        self.triggers.clear();
        self.polling_triggers.clear();
        self.pending_trigger_removals.clear();
        self.requirements.clear();
    }

    /// End this phase and return a fresh scheduler for the next one
    ///
    /// Only the configuration, the stored-subsystem dictionary and the
    /// composed registry carry over.
    pub fn into_next_phase(mut self) -> Scheduler {
        self.end_phase();
        let mut next = Scheduler::new(self.config);
        next.stored = self.stored;
        next.composed = self.composed;
        next
    }

    /// Check the requirement map against the running set
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        for (subsystem, holder) in &self.requirements {
            if !self.running.contains(holder) {
                return Err(format!("{} claimed by {} which is not running", subsystem, holder));
            }
        }
        // Only holds between polls: displaced commands are still running
        // until the cancellation pass.
        for command in &self.running {
            for subsystem in command.required_subsystems() {
                if self.requirements.get(&subsystem) != Some(command) {
                    return Err(format!("{} runs without holding {}", command, subsystem));
                }
            }
        }
        Ok(())
    }
}
