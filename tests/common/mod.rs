//! Common test utilities for cardflow integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/cardflow/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` owns two temporary directories:
/// - `data_dir`: Holds the store and config (via `CF_DATA_DIR`)
/// - `config_dir`: Stands in for the system config location (via `CF_CONFIG_DIR`)
///
/// The `cf()` method returns a `Command` that sets both per-invocation,
/// making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize the store.
    pub fn init() -> Self {
        let env = Self::new();
        env.cf().args(["system", "init"]).assert().success();
        env
    }

    /// Initialized store with project `Planning` (1-5 scale), developer
    /// `dev_001`, stakeholders `stk_001` (same email as `dev_001`) and
    /// `stk_002` (default validator), and epic `PLN-EPC-0001`.
    pub fn with_project() -> Self {
        let env = Self::init();
        env.cf()
            .args([
                "project",
                "create",
                "Planning",
                "--abbreviation",
                "PLN",
                "--scale",
                "1-5",
                "--default-validator",
                "stk_002",
            ])
            .assert()
            .success();
        env.cf()
            .args(["developer", "add", "dev_001", "--name", "Ada", "--email", "ada@example.com", "--join", "Planning"])
            .assert()
            .success();
        env.cf()
            .args(["stakeholder", "add", "stk_001", "--name", "Ada L.", "--email", "ADA@example.com", "--join", "Planning"])
            .assert()
            .success();
        env.cf()
            .args(["stakeholder", "add", "stk_002", "--name", "Grace", "--email", "grace@example.com", "--join", "Planning"])
            .assert()
            .success();
        env.cf()
            .args(["-p", "Planning", "card", "create", "epic", "--set", "title=Reporting"])
            .assert()
            .success();
        env
    }

    /// Get a Command for the cf binary with isolated directories.
    pub fn cf(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cf"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("CF_DATA_DIR", self.data_dir.path());
        cmd.env("CF_CONFIG_DIR", self.config_dir.path());
        cmd.env("CF_USER", "tester");
        cmd.env_remove("CF_LOG");
        cmd
    }

    /// Run `cf` with `args`, assert success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.cf().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "cf {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Run `cf` with `args`, assert failure and parse stderr as JSON.
    pub fn json_error(&self, args: &[&str]) -> Value {
        let output = self.cf().args(args).output().unwrap();
        assert!(
            !output.status.success(),
            "cf {:?} unexpectedly succeeded: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        serde_json::from_slice(&output.stderr).unwrap()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Get the path to the system config directory.
    pub fn config_path(&self) -> &std::path::Path {
        self.config_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A task payload that satisfies creation rules in `Planning`.
pub fn task_json(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "epic": "PLN-EPC-0001",
        "descriptionStructured": [
            {"role": "analyst", "goal": "export reports", "benefit": "share results"}
        ]
    })
    .to_string()
}
