//! Binary smoke tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cadence(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.arg("--config").arg(config).env("NO_COLOR", "1");
    cmd
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("cadence.yml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_simulate_prints_claims_and_summary() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "host:\n  cycles: 200\n");

    cadence(&config)
        .arg("simulate")
        .assert()
        .success()
        .stdout(predicate::str::contains("HoldDrive"))
        .stdout(predicate::str::contains("LockDrive"))
        .stdout(predicate::str::contains("Phase:"))
        .stdout(predicate::str::contains("teleop"));
}

#[test]
fn test_simulate_cycles_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "host:\n  cycles: 200\n  init-cycles: 2\n");

    cadence(&config)
        .args(["simulate", "--cycles", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cycles: 7"))
        .stdout(predicate::str::contains("LockDrive").not());
}

#[test]
fn test_config_prints_effective_yaml() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "scheduler:\n  queue-capacity: 4\n");

    cadence(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("queue-capacity: 4"))
        .stdout(predicate::str::contains("cycle-period-ms: 20"));
}

#[test]
fn test_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "host: [not, a, map]\n");

    cadence(&config)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}
