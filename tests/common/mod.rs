//! Common test utilities for taskflow integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.local/share/taskflow/` or `~/.config/taskflow/` directories.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `tf()` method returns a `Command` that sets `TF_DATA_DIR` and
/// `TF_CONFIG` per-invocation, making tests parallel-safe.
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

    /// Get a Command for the tf binary with isolated data and config.
    pub fn tf(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tf"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("TF_DATA_DIR", self.data_dir.path());
        cmd.env("TF_CONFIG", self.config_path());
        cmd.env_remove("TF_LOG");
        cmd
    }

    /// Path of the config file `tf` reads. It does not exist until written.
    pub fn config_path(&self) -> std::path::PathBuf {
        self.config_dir.path().join("config.kdl")
    }

    /// Write `config.kdl` for subsequent commands.
    pub fn write_config(&self, body: &str) {
        std::fs::write(self.config_path(), body).unwrap();
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Run `tf` with `args`, assert success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.tf().args(args).assert().success().get_output().clone();
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Create a task in project 1 and return its id.
    pub fn create(&self, title: &str, extra: &[&str]) -> u64 {
        let mut args = vec!["task", "create", title, "-P", "1"];
        args.extend_from_slice(extra);
        self.json(&args)["id"].as_u64().unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
