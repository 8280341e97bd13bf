//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the drover binary
fn drover_cmd() -> Command {
    let mut cmd = Command::cargo_bin("drover").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("DROVER_CONFIG");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    drover_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("drover"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("version"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    drover_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("drover "))
        .stdout(predicate::str::contains("target"))
        .stdout(predicate::str::contains("by default (one per CPU)"));
}

#[test]
fn test_version_json() {
    let output = drover_cmd().args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
    assert!(info["git_hash"].is_string());
    assert!(info["default_workers"].as_u64().unwrap() >= 1);
}

#[test]
fn test_short_version_flag() {
    drover_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("drover"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_fixture() {
    drover_cmd()
        .arg("config")
        .arg("show")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("[executor]"))
        .stdout(predicate::str::contains("[logging]"))
        .stdout(predicate::str::contains("fixture-worker"));
}

#[test]
fn test_config_validate_fixture() {
    drover_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_invalid_fixture() {
    drover_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(common::invalid_config_fixture())
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E102"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    drover_cmd()
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/path/drover.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found").or(predicate::str::contains("Error")));
}

#[test]
fn test_config_init_help() {
    drover_cmd()
        .arg("config")
        .arg("init")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"))
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}

// ─────────────────────────────────────────────────────────────────
// Run Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_run_help() {
    drover_cmd()
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("load drill"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--tasks"))
        .stdout(predicate::str::contains("--mode"));
}

#[test]
fn test_run_graceful_drill() {
    drover_cmd()
        .arg("--quiet")
        .arg("run")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .args(["--tasks", "20", "--task-ms", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Submitted:  20"))
        .stdout(predicate::str::contains("Completed:  20"))
        .stdout(predicate::str::contains("Terminated: yes"));
}

#[test]
fn test_run_json_report() {
    let output = drover_cmd()
        .arg("--quiet")
        .arg("run")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .args(["--tasks", "12", "--task-ms", "1", "--panic-every", "4", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["submitted"], 12);
    assert_eq!(report["completed"], 9);
    assert_eq!(report["panicked"], 3);
    assert_eq!(report["terminated"], true);
    assert_eq!(report["rejected_after_shutdown"], true);
    assert_eq!(report["final_state"], "terminated");
}

#[test]
fn test_run_now_mode_accounts_for_every_task() {
    let output = drover_cmd()
        .arg("--quiet")
        .arg("run")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .args(["--tasks", "50", "--task-ms", "10", "--mode", "now", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let completed = report["completed"].as_u64().unwrap();
    let not_run = report["not_run"].as_u64().unwrap();
    assert_eq!(completed + not_run, 50);
    assert_eq!(report["mode"], "now");
}

#[test]
fn test_run_await_timeout_exit_code() {
    drover_cmd()
        .arg("--quiet")
        .arg("run")
        .arg("--config")
        .arg(common::valid_config_fixture())
        .args(["--tasks", "4", "--task-ms", "3000", "--await-secs", "0"])
        .assert()
        .failure()
        .code(50)
        .stdout(predicate::str::contains("Terminated: no"))
        .stderr(predicate::str::contains("E501"));
}

#[test]
fn test_run_with_invalid_config() {
    drover_cmd()
        .arg("run")
        .arg("--config")
        .arg("/nonexistent/drover.toml")
        .assert()
        .failure()
        .code(10);
}

#[test]
fn test_run_invalid_mode() {
    drover_cmd()
        .args(["run", "--mode", "eventually"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ─────────────────────────────────────────────────────────────────
// Verbosity Flag Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag() {
    drover_cmd().arg("-v").arg("version").assert().success();
}

#[test]
fn test_very_verbose_flag() {
    drover_cmd().arg("-vv").arg("version").assert().success();
}

#[test]
fn test_quiet_flag() {
    drover_cmd().arg("--quiet").arg("version").assert().success();
}

// ─────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    drover_cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_subcommand() {
    drover_cmd().assert().failure();
}
