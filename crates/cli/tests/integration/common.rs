//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated project directory.
///
/// Each test gets its own temporary directory holding a root `package.json`,
/// sources and, optionally, installed packages under `node_modules`.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// A project named `app@1.0.0` with the given dependencies.
  pub fn project(deps: &[(&str, &str)]) -> Self {
    let env = Self::empty();
    env.write_package("", "app", "1.0.0", deps);
    env
  }

  /// An empty directory.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Write `<dir>/package.json`.
  pub fn write_package(&self, dir: &str, name: &str, version: &str, deps: &[(&str, &str)]) {
    let deps: serde_json::Map<String, serde_json::Value> = deps
      .iter()
      .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
      .collect();
    let json = serde_json::json!({ "name": name, "version": version, "dependencies": deps });
    let path = if dir.is_empty() {
      "package.json".to_string()
    } else {
      format!("{}/package.json", dir)
    };
    self.write_file(&path, &serde_json::to_string_pretty(&json).unwrap());
  }

  /// Write `bundler.json`.
  pub fn write_config(&self, json: &str) {
    self.write_file("bundler.json", json);
  }

  /// Path inside the default output directory.
  pub fn output_path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join("build").join(relative_path)
  }

  /// Get a pre-configured Command for the bundler binary, run against this project.
  pub fn bundler_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("bundler");
    cmd.arg("--project").arg(self.temp.path());
    cmd.env_remove("BUNDLER_LOG");
    cmd
  }
}
