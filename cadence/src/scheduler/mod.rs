//! Scheduler for command arbitration
//!
//! Owns the subsystem registry, the running set, the requirement map and
//! the transient schedule/cancel queues, and resolves them once per cycle.

mod composed;
mod config;
mod core;
mod queue;

pub use composed::ComposedRegistry;
pub use config::SchedulerConfig;
pub use self::core::Scheduler;
pub use queue::{AttemptOutcome, CommandQueue, SchedulerStats};
