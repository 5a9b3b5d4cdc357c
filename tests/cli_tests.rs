//! Integration tests for the command line surface
//!
//! Runs the built binary against temporary configuration directories.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

const BINARY: &str = env!("CARGO_BIN_EXE_tinc-desktop");

fn command(config_dir: &TempDir) -> Command {
    let mut command = Command::new(BINARY);
    command
        .arg("--config-dir")
        .arg(config_dir.path())
        .env_remove("TINC_DESKTOP_CONFIG_DIR")
        .env_remove("TINC_DESKTOP_PORT")
        .env_remove("TINC_DESKTOP_NETWORK")
        .env_remove("JOURNAL_STREAM");
    command
}

fn add_network(dir: &TempDir, name: &str) {
    let network = dir.path().join(name);
    fs::create_dir_all(&network).unwrap();
    fs::write(network.join("tinc.conf"), "Name = laptop\n").unwrap();
}

#[test]
fn test_help_mentions_commands() {
    let output = Command::new(BINARY)
        .arg("--help")
        .output()
        .expect("Failed to run tinc-desktop --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("networks"));
    assert!(stdout.contains("run"));
}

#[test]
fn test_networks_lists_definitions() {
    let dir = TempDir::new().unwrap();
    add_network(&dir, "office");
    add_network(&dir, "home");

    let output = command(&dir).arg("networks").output().unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "home\noffice\n");
    assert!(dir.path().join("log.txt").exists(), "controller log file");
}

#[test]
fn test_port_requires_network() {
    let dir = TempDir::new().unwrap();

    let output = command(&dir).args(["--port", "40000"]).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_worker_mode_rejects_bad_name() {
    let dir = TempDir::new().unwrap();

    let output = command(&dir)
        .args(["--port", "40000", "--network", "../etc"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_worker_mode_missing_network_fails() {
    let dir = TempDir::new().unwrap();
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let output = command(&dir)
        .args(["--port", &port.to_string(), "--network", "office"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(dir.path().join("office.log").exists(), "worker log file");
}

#[test]
fn test_invalid_settings_exit_code() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("desktop.toml"), "[worker]\nport_attempts = 0\n").unwrap();

    let output = command(&dir).args(["run", "office"]).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
}
