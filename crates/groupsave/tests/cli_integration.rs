//! CLI integration tests for the GroupSave command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - Argument parsing works as expected
//! - Session commands read and clear the on-disk store
//!
//! None of these tests contact a server.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the groupsave binary, isolated from the user's config.
fn groupsave(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("groupsave").unwrap();
    cmd.env("GROUPSAVE_CONFIG_DIR", home.path().join("config"))
        .env("GROUPSAVE_DATA_DIR", home.path().join("data"))
        .env_remove("GROUPSAVE_API_URL")
        .current_dir(home.path());
    cmd
}

fn write_session(home: &TempDir, expires_at: i64) {
    let data = home.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    let session = serde_json::json!({
        "token": "tok",
        "tokenExpiresAt": expires_at.to_string(),
        "user": r#"{"name":"ada lovelace","email":"ada@example.com"}"#,
        "cache_dashboard_data": r#"{"topGroups":[],"myGroups":[],"stats":{}}"#,
    });
    std::fs::write(data.join("session.json"), session.to_string()).unwrap();
}

fn read_session(home: &TempDir) -> serde_json::Value {
    let path = home.path().join("data").join("session.json");
    read_json(&path)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GroupSave"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("groupsave"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("verify-email"))
        .stdout(predicate::str::contains("password"))
        .stdout(predicate::str::contains("dashboard"))
        .stdout(predicate::str::contains("group"))
        .stdout(predicate::str::contains("notifications"))
        .stdout(predicate::str::contains("watch"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Flag Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_global_flags_accepted() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .args([
            "--verbose",
            "--json",
            "--api-url",
            "http://localhost:9999/api/",
            "--help",
        ])
        .assert()
        .success();
}

#[test]
fn test_unknown_subcommand_rejected() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommand Help Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_password_help_lists_steps() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .args(["password", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forgot"))
        .stdout(predicate::str::contains("verify-otp"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_group_help_lists_actions() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .args(["group", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("join"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("approve"))
        .stdout(predicate::str::contains("reject"));
}

#[test]
fn test_dashboard_flags_conflict() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .args(["dashboard", "--refresh", "--cached"])
        .assert()
        .failure();
}

#[test]
fn test_group_show_requires_numeric_id() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .args(["group", "show", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_without_session() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"unauthenticated\""));
}

#[test]
fn test_status_with_valid_session() {
    let home = TempDir::new().unwrap();
    write_session(&home, now_ms() + 3_600_000);

    let output = groupsave(&home)
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let status: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(status["state"], "authenticated");
    assert_eq!(status["name"], "ada lovelace");
    assert!(status["expires_in_secs"].as_u64().unwrap() > 3000);
}

#[test]
fn test_status_with_expired_session_clears_store() {
    let home = TempDir::new().unwrap();
    write_session(&home, now_ms() - 1_000);

    groupsave(&home)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"expired\""));

    let session = read_session(&home);
    assert!(session.get("token").is_none());
    assert!(session.get("cache_dashboard_data").is_none());
}

#[test]
fn test_logout_clears_store() {
    let home = TempDir::new().unwrap();
    write_session(&home, now_ms() + 3_600_000);

    groupsave(&home)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    let session = read_session(&home);
    assert_eq!(session, serde_json::json!({}));

    groupsave(&home)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_dashboard_requires_session() {
    let home = TempDir::new().unwrap();
    groupsave(&home)
        .arg("dashboard")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn test_dashboard_cached_shows_stored_copy() {
    let home = TempDir::new().unwrap();
    write_session(&home, now_ms() + 3_600_000);

    groupsave(&home)
        .args(["--json", "dashboard", "--cached"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stale\": true"))
        .stdout(predicate::str::contains("myGroups"));
}
