use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn hotelctl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hotelctl").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path().join("data"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .env_remove("RUST_LOG")
        .env_remove("HOTELSTORE_FORCE_LOCAL")
        .env_remove("HOTELSTORE_POLL_INTERVAL_MS");
    cmd
}

fn json_out(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_add_approve_list_round_trip() {
    let dir = TempDir::new().unwrap();

    let added = json_out(hotelctl(&dir).args(["add", r#"{"name": "Lake View Inn", "rate": 100}"#]));
    assert_eq!(added["status"], "pending");
    assert!(added["id"].is_number());
    let id = added["id"].to_string();

    let pending = json_out(hotelctl(&dir).args(["list", "--pending"]));
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let approved = json_out(hotelctl(&dir).args(["approve", &id]));
    assert_eq!(approved["status"], "approved");

    let listed = json_out(hotelctl(&dir).arg("list"));
    assert_eq!(listed[0]["name"], "Lake View Inn");
    assert!(json_out(hotelctl(&dir).args(["list", "--pending"]))
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_approve_unknown_prints_null() {
    let dir = TempDir::new().unwrap();
    let out = json_out(hotelctl(&dir).args(["approve", "123"]));
    assert!(out.is_null());
}

#[test]
fn test_add_rejects_non_object() {
    let dir = TempDir::new().unwrap();
    hotelctl(&dir)
        .args(["add", "[1,2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

#[test]
fn test_migrate_without_remote_fails() {
    let dir = TempDir::new().unwrap();
    hotelctl(&dir)
        .arg("migrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--demo-remote"));
}

#[test]
fn test_migrate_with_demo_remote_reports_counts() {
    let dir = TempDir::new().unwrap();
    hotelctl(&dir).args(["add", r#"{"name": "A"}"#]).assert().success();
    hotelctl(&dir).args(["add", r#"{"name": "B"}"#]).assert().success();

    let report = json_out(hotelctl(&dir).args(["migrate", "--demo-remote"]));
    assert_eq!(report["migratedCount"], 2);
    assert_eq!(report["errorCount"], 0);
}

#[test]
fn test_backup_and_restore() {
    let dir = TempDir::new().unwrap();
    hotelctl(&dir).args(["add", r#"{"name": "A"}"#]).assert().success();

    let backup = json_out(hotelctl(&dir).arg("backup"));
    assert_eq!(backup["pendingHotels"], 1);
    assert_eq!(backup["version"], "1.0");

    let restored = json_out(hotelctl(&dir).arg("restore"));
    assert_eq!(restored["restored"], true);
}

#[test]
fn test_watch_stops_after_ticks() {
    let dir = TempDir::new().unwrap();
    hotelctl(&dir).args(["add", r#"{"name": "A"}"#]).assert().success();

    hotelctl(&dir)
        .args(["watch", "--pending", "--ticks", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\":\"A\""));
}

#[test]
fn test_demo_remote_leaves_local_data_and_backup_alone() {
    let dir = TempDir::new().unwrap();
    hotelctl(&dir).args(["add", r#"{"name": "A"}"#]).assert().success();
    hotelctl(&dir).arg("backup").assert().success();

    let listed = json_out(hotelctl(&dir).args(["list", "--pending", "--demo-remote"]));
    assert!(listed.as_array().unwrap().is_empty());
    let demo_backup = json_out(hotelctl(&dir).args(["backup", "--demo-remote"]));
    assert_eq!(demo_backup["pendingHotels"], 0);

    let pending = json_out(hotelctl(&dir).args(["list", "--pending"]));
    assert_eq!(pending.as_array().unwrap().len(), 1);
    let restored = json_out(hotelctl(&dir).arg("restore"));
    assert_eq!(restored["backup"]["pendingHotels"], 1);
}
