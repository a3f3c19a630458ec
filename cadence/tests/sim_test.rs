//! Scripted two-phase simulation

use cadence::Config;
use cadence::sim::{Assignment, Simulation};

fn run(config: Config) -> (cadence::SimulationReport, Vec<Assignment>) {
    let mut seen = Vec::new();
    let report = Simulation::new(config)
        .run(|assignment| seen.push(assignment.clone()))
        .unwrap();
    (report, seen)
}

#[test]
fn test_simulation_drives_routine_and_script() {
    let (report, seen) = run(Config::default());

    assert_eq!(report.phases.len(), 2);
    assert_eq!(report.phases[0].name, "auto");
    assert_eq!(report.phases[1].name, "teleop");

    // 1.0m autonomous drive plus one 0.2m dash in teleop
    assert!(report.distance > 1.15, "distance {}", report.distance);
    assert!(report.heading > 85.0 && report.heading < 95.0, "heading {}", report.heading);
    assert!(report.intake_cycles >= 35 && report.intake_cycles <= 45, "intake {}", report.intake_cycles);

    // The first dash press lands while the lock holds the drivetrain
    assert!(report.phases[1].stats.total_blocked >= 1);
    assert_eq!(report.assignment_changes, seen.len());
}

#[test]
fn test_simulation_first_claims_are_defaults() {
    let (_, seen) = run(Config::default());
    let first = &seen[0];

    assert_eq!(first.phase, "auto");
    assert_eq!(first.cycle, 0);
    assert_eq!(
        first.claims,
        vec![
            ("Drivetrain".to_string(), "HoldDrive".to_string()),
            ("Intake".to_string(), "StopIntake".to_string()),
        ]
    );
    assert!(seen.iter().any(|a| a.claims[0].1.starts_with("Sequential[")));
    assert!(seen.iter().any(|a| a.phase == "teleop" && a.claims[0].1 == "LockDrive"));
    assert!(seen.iter().any(|a| a.phase == "teleop" && a.claims[1].1 == "RunIntake"));
}

#[test]
fn test_simulation_without_refresh_matches() {
    let refreshed = run(Config::default()).0;

    let mut config = Config::default();
    config.scheduler.refresh_between_phases = false;
    let kept = run(config).0;

    assert!((refreshed.distance - kept.distance).abs() < 1e-9);
    assert!((refreshed.heading - kept.heading).abs() < 1e-9);
    assert_eq!(refreshed.intake_cycles, kept.intake_cycles);
    // One scheduler for both phases, so its counters keep running
    assert!(kept.phases[1].stats.cycles > kept.phases[0].stats.cycles);
}

#[test]
fn test_short_simulation_stops_early() {
    let mut config = Config::default();
    config.host.cycles = 20;
    let (report, _) = run(config);

    assert!(report.distance < 1.0);
    assert!((8..=10).contains(&report.intake_cycles), "intake {}", report.intake_cycles);
    assert_eq!(report.phases[0].stats.cycles, 30);
}
