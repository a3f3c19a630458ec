//! Cadence - cycle-driven command scheduler
//!
//! CLI entry point: runs the scripted simulation or prints the effective config.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use cadence::cli::{Cli, Command};
use cadence::config::Config;
use cadence::sim::{Assignment, Simulation, SimulationReport};

fn setup_logging(verbose: bool) -> Result<()> {
    // Logs go to stderr so simulation output on stdout stays clean
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Simulate {
            cycles,
            realtime,
            keep_registrations,
        } => cmd_simulate(config, cycles, realtime, keep_registrations),
        Command::Config => cmd_config(&config),
    }
}

/// Run the two-phase simulation and print every claim change
fn cmd_simulate(mut config: Config, cycles: Option<u64>, realtime: bool, keep_registrations: bool) -> Result<()> {
    if let Some(cycles) = cycles {
        config.host.cycles = cycles;
    }
    if keep_registrations {
        config.scheduler.refresh_between_phases = false;
    }
    info!(?config, "cmd_simulate: starting");

    let report = Simulation::new(config)
        .realtime(realtime)
        .run(print_assignment)
        .context("Simulation failed")?;

    print_report(&report);
    Ok(())
}

fn print_assignment(assignment: &Assignment) {
    let claims: Vec<String> = assignment
        .claims
        .iter()
        .map(|(subsystem, claimant)| {
            if claimant == "-" {
                format!("{}={}", subsystem, claimant.dimmed())
            } else {
                format!("{}={}", subsystem, claimant.cyan())
            }
        })
        .collect();
    println!(
        "{:>6} {:>4} {:<9} {}",
        assignment.phase.yellow(),
        assignment.cycle,
        assignment.run_state.to_string().dimmed(),
        claims.join("  ")
    );
}

fn print_report(report: &SimulationReport) {
    println!();
    for phase in &report.phases {
        let stats = &phase.stats;
        println!("{} {}", "Phase:".bold(), phase.name.cyan());
        println!("  Cycles: {}", stats.cycles);
        println!("  Initialised: {}", stats.total_initialised);
        println!("  Finished: {}", stats.total_finished);
        println!("  Interrupted: {}", stats.total_interrupted);
        println!("  Blocked: {}", stats.total_blocked);
        println!("  Ineligible: {}", stats.total_ineligible);
        println!("  Peak running: {}", stats.peak_running);
    }
    println!("{} {}", "Assignment changes:".bold(), report.assignment_changes);
    println!(
        "{} distance={:.2}m heading={:.1}deg intake-cycles={}",
        "✓".green(),
        report.distance,
        report.heading,
        report.intake_cycles
    );
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
