//! Behavioural smoke tests for the `converge` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Builds a command isolated from the caller's configuration files.
fn converge(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("converge");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("CONVERGE_CONFIG_PATH")
        .env_remove("CONVERGE_LOG");
    cmd
}

fn home() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"))
}

#[test]
fn cli_without_arguments_prints_help() {
    let dir = home();
    converge(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn wait_prints_target_status() {
    let dir = home();
    converge(&dir)
        .args(["wait", "--target", "ACTIVE", "--", "sh", "-c", "echo ACTIVE"])
        .assert()
        .success()
        .stdout("ACTIVE\n");
}

#[test]
fn wait_accepts_absence_as_target() {
    let dir = home();
    converge(&dir)
        .args(["wait", "--phase", "delete", "--target-absent", "--", "true"])
        .assert()
        .success()
        .stdout("NOT_FOUND\n");
}

#[test]
fn wait_rejects_unexpected_status() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--pending",
            "CREATING",
            "--target",
            "ACTIVE",
            "--",
            "sh",
            "-c",
            "echo FAILED",
        ])
        .assert()
        .code(5)
        .stdout("")
        .stderr(predicate::str::contains("unexpected state 'FAILED'"));
}

#[test]
fn wait_times_out_while_pending() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--pending",
            "CREATING",
            "--target",
            "ACTIVE",
            "--timeout-secs",
            "2",
            "--poll-interval-secs",
            "1",
            "--",
            "sh",
            "-c",
            "echo CREATING",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("last status: CREATING"));
}

#[test]
fn not_found_exit_code_fails_when_presence_expected() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--target",
            "ACTIVE",
            "--not-found-exit-code",
            "3",
            "--",
            "sh",
            "-c",
            "exit 3",
        ])
        .assert()
        .code(4);
}

#[test]
fn fail_fast_reports_lookup_failure() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--target",
            "ACTIVE",
            "--fail-fast",
            "--",
            "sh",
            "-c",
            "echo boom >&2; exit 9",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("boom"));
}

#[test]
fn missing_status_command_is_a_lookup_failure() {
    let dir = home();
    converge(&dir)
        .args(["wait", "--target", "ACTIVE", "--", "/nonexistent/status-command"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to spawn"));
}

#[test]
fn json_report_describes_convergence() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--json",
            "--target",
            "ACTIVE",
            "--",
            "sh",
            "-c",
            "echo ACTIVE",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""outcome":"converged""#)
                .and(predicate::str::contains(r#""status":"ACTIVE""#)),
        );
}

#[test]
fn long_poll_interval_is_checked_against_selected_phase_only() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--phase",
            "create",
            "--target",
            "ACTIVE",
            "--timeout-secs",
            "1200",
            "--poll-interval-secs",
            "700",
            "--",
            "sh",
            "-c",
            "echo ACTIVE",
        ])
        .assert()
        .success()
        .stdout("ACTIVE\n");
}

#[test]
fn oversized_timeout_is_a_usage_error() {
    let dir = home();
    converge(&dir)
        .args([
            "wait",
            "--target",
            "ACTIVE",
            "--timeout-secs",
            "18446744073709551615",
            "--",
            "sh",
            "-c",
            "echo ACTIVE",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timeout must not exceed"));
}
