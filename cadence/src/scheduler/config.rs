//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Emit per-cycle lifecycle logging
    #[serde(rename = "logging-enabled")]
    pub logging_enabled: bool,

    /// Start each host phase with a fresh scheduler
    ///
    /// When false the host keeps the previous phase's registrations and only
    /// ends its running commands.
    #[serde(rename = "refresh-between-phases")]
    pub refresh_between_phases: bool,

    /// Initial capacity of the schedule and cancel queues
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            logging_enabled: true,
            refresh_between_phases: true,
            queue_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert!(config.logging_enabled);
        assert!(config.refresh_between_phases);
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: SchedulerConfig = serde_yaml::from_str("refresh-between-phases: false\n").unwrap();
        assert!(!config.refresh_between_phases);
        assert!(config.logging_enabled);
        assert_eq!(config.queue_capacity, 16);
    }
}
