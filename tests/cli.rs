//! CLI integration tests for sheepdog commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use sheepdog::store::{SqliteStore, Store};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sheepdog").expect("failed to find binary");
        cmd.env("NO_COLOR", "1")
            .env_remove("SHEEPDOG_INDEX_URL")
            .env_remove("SHEEPDOG_INDEX_USERNAME")
            .env_remove("SHEEPDOG_INDEX_PASSWORD");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }
}

#[test]
fn test_init_creates_database_and_admin_token() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin token"));

    let token_path = ctx.data_dir().join(".admin_token");
    let token = std::fs::read_to_string(&token_path).expect("read admin token");
    assert!(token.starts_with("sheepdog_"));

    let store = SqliteStore::new(ctx.data_dir().join("sheepdog.db")).expect("open store");
    assert!(store.has_admin_token().expect("check admin token"));
}

#[cfg(unix)]
#[test]
fn test_init_restricts_token_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    let metadata = std::fs::metadata(ctx.data_dir().join(".admin_token")).expect("stat token");
    assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sheepdog admin init"));
}

#[test]
fn test_release_requires_index_url() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args([
            "release",
            "--release-number",
            "R1",
            "--node-id",
            "node-1",
            "--data-dir",
            &ctx.data_dir_str(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("index URL is required"));
}

#[test]
fn test_release_requires_node_id() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["release", "--release-number", "R1"])
        .assert()
        .failure();
}

#[test]
fn test_release_rejects_bad_config_file() {
    let ctx = TestContext::new();
    std::fs::write(ctx.data_dir().join("sheepdog.toml"), "[index\nurl = ").expect("write config");

    ctx.cmd()
        .args([
            "release",
            "--release-number",
            "R1",
            "--node-id",
            "node-1",
            "--data-dir",
            &ctx.data_dir_str(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sheepdog.toml"));
}
