//! Cadence configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler behavior
    pub scheduler: SchedulerConfig,

    /// Host loop used by the simulator
    pub host: HostConfig,
}

/// Host loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Wall-clock period of one cycle when running in real time
    #[serde(rename = "cycle-period-ms")]
    pub cycle_period_ms: u64,

    /// Active-phase cycles per simulated phase
    pub cycles: u64,

    /// Pre-start cycles per simulated phase
    #[serde(rename = "init-cycles")]
    pub init_cycles: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: 20,
            cycles: 250,
            init_cycles: 10,
        }
    }
}

impl HostConfig {
    pub fn cycle_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cycle_period_ms)
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .cadence.yml
        let local_config = PathBuf::from(".cadence.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/cadence/cadence.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cadence").join("cadence.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}
