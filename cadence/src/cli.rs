//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cadence - cycle-driven command scheduler
#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    about = "Cycle-driven cooperative command scheduler",
    version,
    after_help = "Set RUST_LOG=cadence=debug for per-cycle arbitration logs"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scripted autonomous + driver simulation
    Simulate {
        /// Active-phase cycles per phase (overrides config)
        #[arg(short = 'n', long)]
        cycles: Option<u64>,

        /// Sleep one cycle period between cycles
        #[arg(long)]
        realtime: bool,

        /// Keep registrations across the phase handoff instead of refreshing
        #[arg(long)]
        keep_registrations: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_simulate_defaults() {
        let cli = Cli::parse_from(["cadence", "simulate"]);
        match cli.command {
            Command::Simulate {
                cycles,
                realtime,
                keep_registrations,
            } => {
                assert!(cycles.is_none());
                assert!(!realtime);
                assert!(!keep_registrations);
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parse_simulate_flags() {
        let cli = Cli::parse_from(["cadence", "-v", "simulate", "-n", "40", "--keep-registrations"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Simulate {
                cycles,
                keep_registrations,
                ..
            } => {
                assert_eq!(cycles, Some(40));
                assert!(keep_registrations);
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parse_global_config() {
        let cli = Cli::parse_from(["cadence", "config", "--config", "/tmp/cadence.yml"]);
        assert!(matches!(cli.command, Command::Config));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cadence.yml")));
    }
}
