#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn relay(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("relay").unwrap();
    // Hermetic: state and config live in the temp dir, no real tmux on the
    // path, and no inherited pane identity.
    cmd.env("AGENT_RELAY_STATE", dir.path())
        .env("AGENT_RELAY_CONFIG", dir.path().join("config.yaml"))
        .env("PATH", "")
        .env_remove("TMUX_PANE");
    cmd
}

fn write_config(dir: &TempDir) {
    std::fs::write(
        dir.path().join("config.yaml"),
        "endpoints:\n  - name: claude\n    address: \"%5\"\n  - name: codex\n    address: \"%7\"\nwait:\n  timeout_ms: 1000\n  poll_interval_ms: 100\n",
    )
    .unwrap();
}

/// Stand-in tmux on an otherwise empty PATH: logs every invocation,
/// succeeds on send-keys, and answers capture-pane with stable markerless
/// output.
fn install_fake_tmux(dir: &TempDir) -> PathBuf {
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let log = dir.path().join("tmux.log");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> {}\ncase \"$1\" in\n  capture-pane) printf 'working\\n' ;;\nesac\nexit 0\n",
        log.display()
    );
    let path = bin.join("tmux");
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    bin
}

// ---------------------------------------------------------------------------
// relay endpoints
// ---------------------------------------------------------------------------

#[test]
fn endpoints_lists_configured_endpoints() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    relay(&dir)
        .arg("endpoints")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("claude")
                .and(predicate::str::contains("%5"))
                .and(predicate::str::contains("codex")),
        );
}

#[test]
fn endpoints_json_output() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    relay(&dir)
        .args(["endpoints", "--json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"name\": \"claude\"")
                .and(predicate::str::contains("\"active\": false")),
        );
}

#[test]
fn missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .arg("endpoints")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

// ---------------------------------------------------------------------------
// relay send
// ---------------------------------------------------------------------------

#[test]
fn send_to_unknown_endpoint_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    relay(&dir)
        .args(["send", "gemini", "hello"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("endpoint not found: gemini"));
}

#[test]
fn send_without_tmux_reports_send_failure() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    relay(&dir)
        .args(["send", "claude", "hello"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to invoke tmux"));
}

#[test]
fn send_delivers_message_through_tmux() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    let bin = install_fake_tmux(&dir);
    relay(&dir)
        .env("PATH", &bin)
        .args(["send", "claude", "hello", "there"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent to claude"));

    let log = std::fs::read_to_string(dir.path().join("tmux.log")).unwrap();
    assert!(log.contains("send-keys"));
    assert!(log.contains("hello there"));
}

// ---------------------------------------------------------------------------
// Exit-code mapping
// ---------------------------------------------------------------------------

#[test]
fn wait_timeout_maps_to_exit_code_two() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    let bin = install_fake_tmux(&dir);
    // capture-pane answers with stable output and no marker, so the 1s
    // configured timeout expires.
    relay(&dir)
        .env("PATH", &bin)
        .args(["send", "claude", "--wait", "hello"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn broadcast_timeout_maps_to_exit_code_two() {
    let dir = TempDir::new().unwrap();
    write_config(&dir);
    let bin = install_fake_tmux(&dir);
    relay(&dir)
        .env("PATH", &bin)
        .args(["broadcast", "status please"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("timeout"));
}

#[test]
fn broadcast_without_endpoints_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.yaml"), "endpoints: []\n").unwrap();
    relay(&dir)
        .args(["broadcast", "hello"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no endpoints configured"));
}

// ---------------------------------------------------------------------------
// relay state
// ---------------------------------------------------------------------------

fn seed_active_entry(dir: &TempDir) {
    std::fs::write(
        dir.path().join("active.yaml"),
        "entries:\n  claude:\n    request_id: req-old\n    nonce: deadbeef\n    address: \"%5\"\n    started_at_ms: 0\n",
    )
    .unwrap();
}

#[test]
fn state_show_without_entries() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .args(["state", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No in-flight requests"));
}

#[test]
fn state_show_lists_entries() {
    let dir = TempDir::new().unwrap();
    seed_active_entry(&dir);
    relay(&dir)
        .args(["state", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude").and(predicate::str::contains("req-old")));
}

#[test]
fn state_cleanup_removes_stale_entries() {
    let dir = TempDir::new().unwrap();
    seed_active_entry(&dir);
    relay(&dir)
        .args(["state", "cleanup", "--ttl-secs", "60"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 stale entries"));

    relay(&dir)
        .args(["state", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No in-flight requests"));
}
