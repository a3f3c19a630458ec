//! Cadence - cycle-driven cooperative command scheduler
//!
//! Commands declare the subsystems they need and the run states they may run
//! in. Once per control cycle the host calls [`Scheduler::poll`], which
//! retires finished commands, admits newly requested ones under exclusive
//! subsystem ownership, backfills idle subsystems with their default commands,
//! and executes everything still running.
//!
//! # Modules
//!
//! - [`scheduler`] - Arbitration, queues, composed-command registry
//! - [`command`] - Command trait, handles, lambda and group commands
//! - [`subsystem`] - Subsystem trait and handles
//! - [`trigger`] - Edge-triggered bindings from conditions to commands
//! - [`run_state`] - Host lifecycle phases and run-state sets
//! - [`sim`] - Scripted two-phase host used by the CLI
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod run_state;
pub mod scheduler;
pub mod sim;
pub mod subsystem;
pub mod trigger;

// Re-export commonly used types
pub use command::{
    Command, CommandHandle, CommandId, LambdaCommand, ParallelGroup, ParallelMode, Requirements, SequentialGroup,
    WeakCommandHandle,
};
pub use config::{Config, HostConfig};
pub use error::{Result, SchedulerError};
pub use run_state::{RunState, RunStates};
pub use scheduler::{AttemptOutcome, Scheduler, SchedulerConfig, SchedulerStats};
pub use sim::{Simulation, SimulationReport};
pub use subsystem::{Subsystem, SubsystemHandle, SubsystemId};
pub use trigger::{Edge, Trigger, TriggerId};
