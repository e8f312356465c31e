#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: register the fleet and open a call
    let mut calls = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        calls,
        r#"{{"status": "S", "priority": "A", "details": "fall", "ambulancecall_set": [{{"ambulance_id": 1}}]}}"#
    )
    .unwrap();

    let mut cmd1 = Command::new(cargo_bin!("emsdispatch"));
    cmd1.arg("--db-path")
        .arg(&db_path)
        .arg("calls")
        .arg("--ambulances")
        .arg("tests/fixtures/ambulances.csv")
        .arg("--calls")
        .arg(calls.path());

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,S,A,1,0,0,"));

    // 2. Second run: only updates, against the same DB path
    let mut updates = tempfile::NamedTempFile::new().unwrap();
    writeln!(updates, "ambulance,status,latitude,longitude").unwrap();
    writeln!(updates, "BUS-1,PB,32.6,-117.1").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("emsdispatch"));
    cmd2.arg("--db-path")
        .arg(&db_path)
        .arg("history")
        .arg("BUS-1")
        .arg("--updates")
        .arg(updates.path())
        .arg("--call")
        .arg("1");

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // The ambulance, the call and the id sequences survived the restart
    assert!(stdout2.contains("4,BUS-1,PB,32.6,-117.1"));

    // 3. Third run: the board still shows the call
    let mut cmd3 = Command::new(cargo_bin!("emsdispatch"));
    cmd3.arg("--db-path").arg(&db_path).arg("calls");

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    assert!(String::from_utf8_lossy(&output3.stdout).contains("1,S,A,1,0,0,"));
}
