//! Scheduler error types

use thiserror::Error;

/// Errors raised at the scheduler's API boundary
///
/// Ineligible or blocked commands are not errors; they are silently deferred
/// and only observable through `Scheduler::is_scheduled`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Command {command} has been composed and may not be scheduled individually or composed again")]
    AlreadyComposed { command: String },

    #[error("Default command {command} for subsystem {subsystem} must require exactly that subsystem or nothing")]
    InvalidDefaultCommand { subsystem: String, command: String },

    #[error("Invalid composition: {reason}")]
    InvalidComposition { reason: String },

    #[error("Subsystem not registered: {subsystem}")]
    UnknownSubsystem { subsystem: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
