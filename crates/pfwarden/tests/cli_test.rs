//! Integration tests for the `pfwarden` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! config handling and error exit codes without a live console.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `pfwarden` binary with env isolation.
///
/// Clears all `PFWARDEN_*` env vars and points config directories at
/// `config_home` so tests never touch the user's real configuration.
fn pfwarden_cmd(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pfwarden");
    cmd.env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("PFWARDEN_PROFILE")
        .env_remove("PFWARDEN_URL")
        .env_remove("PFWARDEN_USERNAME")
        .env_remove("PFWARDEN_PASSWORD")
        .env_remove("PFWARDEN_OUTPUT")
        .env_remove("PFWARDEN_INSECURE")
        .env_remove("PFWARDEN_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Write `contents` where the binary looks for its config on Linux.
fn write_config(config_home: &Path, contents: &str) {
    let dir = config_home.join("pfwarden");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = pfwarden_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_resources() {
    let home = tempfile::tempdir().unwrap();
    pfwarden_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("ip-aliases")
            .and(predicate::str::contains("port-aliases"))
            .and(predicate::str::contains("domain-overrides"))
            .and(predicate::str::contains("host-overrides"))
            .and(predicate::str::contains("static-mappings"))
            .and(predicate::str::contains("apply")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    pfwarden_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pfwarden"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    pfwarden_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_create_requires_from_file() {
    let home = tempfile::tempdir().unwrap();
    let output = pfwarden_cmd(home.path())
        .args(["domain-overrides", "create"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--from-file"));
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = pfwarden_cmd(home.path())
        .args(["--output", "xml", "ip-aliases", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected output format error:\n{text}"
    );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    pfwarden_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
default_profile = "lab"

[profiles.lab]
url = "https://10.0.0.1"
username = "admin"
password = "hunter2"
"#,
    );

    pfwarden_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.lab]")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

// ── Error exit codes ────────────────────────────────────────────────

#[test]
fn test_missing_config_is_reported() {
    let home = tempfile::tempdir().unwrap();
    pfwarden_cmd(home.path())
        .args(["ip-aliases", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_profile_lists_available() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[profiles.home]\nurl = \"https://10.0.0.1\"\n");

    pfwarden_cmd(home.path())
        .args(["--profile", "office", "port-aliases", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("home"));
}

#[test]
fn test_missing_password_is_an_auth_error() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "[profiles.pfwarden-cli-test-nopass]\nurl = \"https://127.0.0.1:9\"\n",
    );

    pfwarden_cmd(home.path())
        .args(["--profile", "pfwarden-cli-test-nopass", "host-overrides", "list"])
        .assert()
        .failure()
        .code(3);
}

#[test]
fn test_unreachable_console_fails_login() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
[profiles.pfwarden-cli-test-down]
url = "http://127.0.0.1:9"
password = "pfsense"
max_attempts = 1
timeout = 2
"#,
    );

    pfwarden_cmd(home.path())
        .args(["--profile", "pfwarden-cli-test-down", "ip-aliases", "list"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));
}
