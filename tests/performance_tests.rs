use assert_cmd::cargo_bin;
use std::process::Command;

mod common;

#[test]
fn test_large_update_stream() {
    let dir = tempfile::tempdir().unwrap();
    let ambulances = dir.path().join("ambulances.csv");
    let updates = dir.path().join("updates.csv");
    common::generate_ambulances(&ambulances, 50).expect("Failed to generate ambulances");
    common::generate_updates(&updates, 50, 100_000).expect("Failed to generate updates");

    let output = Command::new(cargo_bin!("emsdispatch"))
        .arg("history")
        .arg("BUS-1")
        .arg("--ambulances")
        .arg(&ambulances)
        .arg("--updates")
        .arg(&updates)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success(), "Binary failed to process update stream");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let timestamps: Vec<&str> = stdout
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(6).expect("Missing timestamp"))
        .collect();
    // Registration plus roughly 2000 reports, in time order
    assert!(timestamps.len() > 1000);
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}
