use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const HEADER: &str = "id,ambulance,status,latitude,longitude,orientation,timestamp,comment,updated_by";

fn history(identifier: &str) -> Command {
    let mut cmd = Command::new(cargo_bin!("emsdispatch"));
    cmd.env_remove("RUST_LOG")
        .arg("history")
        .arg(identifier)
        .arg("--ambulances")
        .arg("tests/fixtures/ambulances.csv")
        .arg("--calls")
        .arg("tests/fixtures/calls.json")
        .arg("--updates")
        .arg("tests/fixtures/updates.csv");
    cmd
}

#[test]
fn test_history_in_range() {
    let mut cmd = history("BUS-1");
    cmd.arg("--since")
        .arg("2024-01-01T00:00:00Z")
        .arg("--until")
        .arg("2024-12-31T00:00:00Z");

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines[0], HEADER);
    assert_eq!(
        &lines[1..],
        &[
            "4,BUS-1,PB,32.52,-117.02,90.0,2024-01-01T10:00:00Z,,dispatcher",
            // Status only: position and heading carry over
            "5,BUS-1,AP,32.52,-117.02,90.0,2024-01-01T10:10:00Z,on scene,dispatcher",
            // The comment also carries over until replaced
            "6,BUS-1,HB,32.53,-117.03,180.0,2024-01-01T10:30:00Z,on scene,dispatcher",
        ]
    );
}

#[test]
fn test_history_bounds_are_inclusive() {
    let mut cmd = history("BUS-1");
    cmd.arg("--since")
        .arg("2024-01-01T10:10:00Z")
        .arg("--until")
        .arg("2024-01-01T10:10:00Z");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("5,BUS-1,AP"))
        .stdout(predicate::str::contains("4,BUS-1").not())
        .stdout(predicate::str::contains("6,BUS-1").not());
}

#[test]
fn test_history_open_range_includes_registration() {
    history("BUS-2")
        .assert()
        .success()
        .stdout(predicate::str::contains("2,BUS-2,AV,32.51,-117.01,0.0,"));
}

#[test]
fn test_history_inverted_range_fails() {
    let mut cmd = history("BUS-1");
    cmd.arg("--since")
        .arg("2024-02-01T00:00:00Z")
        .arg("--until")
        .arg("2024-01-01T00:00:00Z");
    cmd.assert().failure();
}

#[test]
fn test_history_for_pending_call_is_empty() {
    let mut cmd = history("BUS-1");
    cmd.arg("--call").arg("1");

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), HEADER);
}

#[test]
fn test_history_for_call_not_involving_ambulance_fails() {
    let mut cmd = history("BUS-3");
    cmd.arg("--call").arg("1");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not assigned"));
}

#[test]
fn test_history_call_conflicts_with_range() {
    let mut cmd = history("BUS-1");
    cmd.arg("--call").arg("1").arg("--since").arg("2024-01-01T00:00:00Z");
    cmd.assert().failure();
}

#[test]
fn test_history_unknown_ambulance_fails() {
    history("BUS-404").assert().failure();
}
