//! Integration tests for the eventlog CLI
//!
//! These tests run the actual binary against a temp log directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the binary to test, with the env-based config cleared
#[allow(deprecated)]
fn eventlog_cmd() -> Command {
    let mut cmd = Command::cargo_bin("eventlog").unwrap();
    for key in [
        "APP_HOME",
        "EVENTLOG_DIR",
        "EVENTLOG_ROTATION",
        "EVENTLOG_MAX_BYTES",
        "EVENTLOG_BACKUP_COUNT",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn write_schema(dir: &Path) -> PathBuf {
    let path = dir.join("events.yaml");
    fs::write(
        &path,
        r#"
SOME_PAYMENT:
  id: 0x62001
  fields: [first, second, third]
TEST_PASSED:
  id: 12349
  fields: [userName, amount]
"#,
    )
    .unwrap();
    path
}

#[test]
fn test_help_flag() {
    eventlog_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("emit"))
        .stdout(predicate::str::contains("stress"))
        .stdout(predicate::str::contains("One stress worker").not());
}

#[test]
fn test_emit_help() {
    eventlog_cmd()
        .args(["emit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--log-dir"))
        .stdout(predicate::str::contains("--rotation"));
}

// ============================================================================
// emit
// ============================================================================

#[test]
fn test_emit_writes_event_and_layout() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());
    let log_dir = temp_dir.path().join("logs");

    eventlog_cmd()
        .arg("emit")
        .arg("--schema")
        .arg(&schema)
        .args(["--id", "0x62001", "third=DE", "first=PAYMENT"])
        .arg("--log-dir")
        .arg(&log_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("logged event 62001"));

    let events = fs::read_to_string(log_dir.join("eventlog.log")).unwrap();
    assert_eq!(events.lines().count(), 1);
    assert!(events.ends_with("   62001\tPAYMENT\tDE\n"), "{events:?}");

    let layout = fs::read_to_string(log_dir.join("eventlog.layout")).unwrap();
    assert_eq!(layout.lines().count(), 2, "both schema events are declared");
    assert!(layout.contains(" 62001\tSOME_PAYMENT\tfirst\tsecond\tthird\n"));
    assert!(layout.contains(" 303d\tTEST_PASSED\tuserName\tamount\n"));
}

#[test]
fn test_emit_json_values_and_null() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());
    let log_dir = temp_dir.path().join("logs");

    eventlog_cmd()
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "12349"])
        .args(["--json", r#"{"userName": null, "amount": 3}"#])
        .arg("--log-dir")
        .arg(&log_dir)
        .assert()
        .success();

    let events = fs::read_to_string(log_dir.join("eventlog.log")).unwrap();
    assert!(events.ends_with("   303d\tnull\t3\n"), "{events:?}");
}

#[test]
fn test_emit_escapes_tabs() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());
    let log_dir = temp_dir.path().join("logs");

    eventlog_cmd()
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "0x62001", "second=a\tb"])
        .arg("--log-dir")
        .arg(&log_dir)
        .assert()
        .success();

    let events = fs::read_to_string(log_dir.join("eventlog.log")).unwrap();
    assert!(events.ends_with("   62001\ta\\tb\n"), "{events:?}");
}

#[test]
fn test_emit_log_dir_from_env() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());

    eventlog_cmd()
        .env("APP_HOME", temp_dir.path())
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "12349", "userName=test"])
        .assert()
        .success();

    let events = fs::read_to_string(temp_dir.path().join("logs/eventlog.log")).unwrap();
    assert!(events.ends_with("   303d\ttest\n"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_emit_unregistered_id() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());
    let log_dir = temp_dir.path().join("logs");

    eventlog_cmd()
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "0x1"])
        .arg("--log-dir")
        .arg(&log_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("EVL-005"))
        .stderr(predicate::str::contains("Fix:"));

    let events = fs::read_to_string(log_dir.join("eventlog.log")).unwrap_or_default();
    assert!(events.is_empty());
}

#[test]
fn test_emit_invalid_id() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());

    eventlog_cmd()
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "id"])
        .arg("--log-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("EVL-001"));
}

#[test]
fn test_emit_invalid_schema_name() {
    let temp_dir = TempDir::new().unwrap();
    let schema = temp_dir.path().join("bad.yaml");
    fs::write(&schema, "event_name:\n  id: 1\n  fields: []\n").unwrap();

    eventlog_cmd()
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "1"])
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("EVL-002"))
        .stderr(predicate::str::contains("UPPERCASE_WITH_UNDERSCORES"));
}

#[test]
fn test_emit_bad_pair() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());

    eventlog_cmd()
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "12349", "userName"])
        .arg("--log-dir")
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn test_bad_rotation_env() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());

    eventlog_cmd()
        .env("EVENTLOG_ROTATION", "weekly")
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "12349"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error"));
}

// ============================================================================
// Config layering
// ============================================================================

#[test]
fn test_env_overrides_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());
    let config = temp_dir.path().join("eventlog.yaml");
    fs::write(
        &config,
        format!("log_dir: {}\n", temp_dir.path().join("from-yaml").display()),
    )
    .unwrap();
    let env_dir = temp_dir.path().join("from-env");

    eventlog_cmd()
        .env("EVENTLOG_DIR", &env_dir)
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "12349", "userName=test"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert!(env_dir.join("eventlog.log").exists());
    assert!(!temp_dir.path().join("from-yaml/eventlog.log").exists());
}

#[test]
fn test_max_bytes_with_time_rotation_warns() {
    let temp_dir = TempDir::new().unwrap();
    let schema = write_schema(temp_dir.path());

    eventlog_cmd()
        .env_remove("RUST_LOG")
        .arg("emit")
        .arg("-s")
        .arg(&schema)
        .args(["-i", "12349", "userName=test"])
        .args(["--rotation", "midnight", "--max-bytes", "10"])
        .arg("--log-dir")
        .arg(temp_dir.path().join("logs"))
        .assert()
        .success()
        .stderr(predicate::str::contains("--max-bytes ignored"));
}

#[test]
fn test_stress_rejects_out_of_range_processes() {
    let temp_dir = TempDir::new().unwrap();

    for processes in ["0", "100000"] {
        eventlog_cmd()
            .args(["stress", "--processes", processes])
            .arg("--log-dir")
            .arg(temp_dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("--processes"));
    }
    assert!(!temp_dir.path().join("eventlog.log").exists());
}
