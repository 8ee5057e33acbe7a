//! Integration tests for the sandbox-router CLI.
//!
//! These run the actual executable. None of them need a Docker daemon:
//! they only exercise parsing, configuration loading and the comparison
//! output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// -----------------------------------------------------------------------------
// Test helpers
// -----------------------------------------------------------------------------

const ENV_OVERRIDES: &[&str] = &[
    "SANDBOX_ROUTER_CONFIG",
    "AIO_SANDBOX_ENABLED",
    "AIO_SANDBOX_IMAGE",
    "SANDBOX_ADDRESS",
    "SANDBOX_READINESS_STRICT",
    "RUST_LOG",
];

/// Creates a Command for the binary running in `dir`, isolated from the
/// caller's environment overrides.
#[allow(deprecated)]
fn router_in(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sandbox-router").expect("failed to find binary");
    cmd.current_dir(dir.path());
    for key in ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("router.toml");
    fs::write(&path, content).unwrap();
    path
}

// -----------------------------------------------------------------------------
// Help and version tests
// -----------------------------------------------------------------------------

#[test]
fn test_help_shows_all_commands() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sandbox-router"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("shell"))
        .stdout(predicate::str::contains("file"))
        .stdout(predicate::str::contains("browser"));
}

#[test]
fn test_file_help_lists_operations() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["file", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("read"))
        .stdout(predicate::str::contains("write"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("download"));
}

#[test]
fn test_shell_help_lists_operations() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["shell", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("view"))
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("kill"));
}

#[test]
fn test_version_shows_version() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_exec_help_shows_options() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["exec", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("--session"))
        .stdout(predicate::str::contains("--dir"));
}

// -----------------------------------------------------------------------------
// Compare tests
// -----------------------------------------------------------------------------

#[test]
fn test_compare_json_defaults_to_legacy() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["compare", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current_default\": \"legacy\""))
        .stdout(predicate::str::contains("\"aio_available\": false"));
}

#[test]
fn test_compare_json_follows_config_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[aio]\nenabled = true\n");

    router_in(&dir)
        .arg("--config")
        .arg(&config)
        .args(["compare", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current_default\": \"aio\""))
        .stdout(predicate::str::contains("\"aio_available\": true"));
}

#[test]
fn test_compare_discovers_local_config() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sandbox-router.toml"), "[aio]\nenabled = true\n").unwrap();

    router_in(&dir)
        .args(["compare", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current_default\": \"aio\""));
}

#[test]
fn test_config_file_source_is_logged() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[aio]\nenabled = true\n");

    router_in(&dir)
        .arg("--config")
        .arg(&config)
        .args(["compare", "--json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded configuration from"))
        .stderr(predicate::str::contains("router.toml"));
}

#[test]
fn test_env_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[aio]\nenabled = true\n");

    router_in(&dir)
        .env("AIO_SANDBOX_ENABLED", "false")
        .arg("--config")
        .arg(&config)
        .args(["compare", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current_default\": \"legacy\""));
}

#[test]
fn test_compare_human_output_lists_both_variants() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .env("NO_COLOR", "1")
        .arg("compare")
        .assert()
        .success()
        .stdout(predicate::str::contains("(legacy)"))
        .stdout(predicate::str::contains("(aio)"))
        .stdout(predicate::str::contains("Default:"));
}

// -----------------------------------------------------------------------------
// Error tests
// -----------------------------------------------------------------------------

#[test]
fn test_unknown_sandbox_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["status", "sandbox-1234", "--type", "podman"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported sandbox type"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["--config", "does-not-exist.toml", "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_malformed_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "bind = [not toml");

    router_in(&dir)
        .arg("--config")
        .arg(&config)
        .arg("compare")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_zero_cache_size_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "instance_cache_size = 0\n");

    router_in(&dir)
        .arg("--config")
        .arg(&config)
        .arg("compare")
        .assert()
        .failure()
        .stderr(predicate::str::contains("instance_cache_size"));
}

#[test]
fn test_unknown_type_rejected_for_file_commands() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["file", "list", "sandbox-1234", "--type", "vm", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported sandbox type"));
}

#[test]
fn test_invalid_env_boolean_fails() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .env("AIO_SANDBOX_ENABLED", "maybe")
        .arg("compare")
        .assert()
        .failure()
        .stderr(predicate::str::contains("AIO_SANDBOX_ENABLED"));
}

#[test]
fn test_exec_requires_a_command() {
    let dir = TempDir::new().unwrap();
    router_in(&dir)
        .args(["exec", "sandbox-1234"])
        .assert()
        .failure();
}
