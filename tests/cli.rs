// ABOUTME: Integration tests for the remora CLI.
// ABOUTME: Validates help output, argument validation, and failure exit paths.

use assert_cmd::Command;
use predicates::prelude::*;

fn remora_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("remora"))
}

#[test]
fn help_shows_commands() {
    remora_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("fetch"));
}

#[test]
fn run_requires_connection_args() {
    remora_cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--host"));
}

#[test]
fn host_key_policy_flags_conflict() {
    remora_cmd()
        .args([
            "run",
            "--host",
            "example.com",
            "--user",
            "testuser",
            "--key",
            "/tmp/key",
            "--tofu",
            "--insecure-accept-any",
            "true",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn missing_key_fails_before_connecting() {
    remora_cmd()
        .args([
            "run",
            "--host",
            "127.0.0.1",
            "--port",
            "1",
            "--user",
            "testuser",
            "--key",
            "/nonexistent/key/path",
            "--insecure-accept-any",
            "echo hello",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load key"));
}

#[test]
fn fetch_requires_remote_and_local_dirs() {
    remora_cmd()
        .args([
            "fetch",
            "--host",
            "example.com",
            "--user",
            "testuser",
            "--key",
            "/tmp/key",
            "somefile",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--remote-dir"));
}

#[test]
fn missing_key_failure_emits_json_when_requested() {
    remora_cmd()
        .args([
            "--json",
            "run",
            "--host",
            "127.0.0.1",
            "--port",
            "1",
            "--user",
            "testuser",
            "--key",
            "/nonexistent/key/path",
            "--insecure-accept-any",
            "echo hello",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"event\":\"error\""));
}
