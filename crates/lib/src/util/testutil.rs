//! Test utilities for bundler-lib.
//!
//! Helpers that lay out small project trees on disk: a root `package.json`,
//! installed packages under `node_modules` and source files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::package::PackageJson;
use crate::util::path::to_posix;

/// Build a `PackageJson` value.
pub fn package_json(name: &str, version: &str, deps: &[(&str, &str)], peers: &[(&str, &str)]) -> PackageJson {
  let map = |pairs: &[(&str, &str)]| -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  };
  PackageJson {
    name: name.to_string(),
    version: version.to_string(),
    dependencies: map(deps),
    peer_dependencies: map(peers),
  }
}

/// Write `<root>/<dir>/package.json` with the given dependencies.
pub fn write_package(root: &Path, dir: &str, name: &str, version: &str, deps: &[(&str, &str)]) -> PathBuf {
  write_package_with_peers(root, dir, name, version, deps, &[])
}

/// Write `<root>/<dir>/package.json` with dependencies and peer dependencies.
pub fn write_package_with_peers(
  root: &Path,
  dir: &str,
  name: &str,
  version: &str,
  deps: &[(&str, &str)],
  peers: &[(&str, &str)],
) -> PathBuf {
  let to_object = |pairs: &[(&str, &str)]| -> serde_json::Map<String, serde_json::Value> {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
      .collect()
  };
  let json = serde_json::json!({
    "name": name,
    "version": version,
    "dependencies": to_object(deps),
    "peerDependencies": to_object(peers),
  });

  let path = root.join(dir).join("package.json");
  write_file(root, &to_posix(path.strip_prefix(root).unwrap()), &serde_json::to_string_pretty(&json).unwrap());
  path
}

/// Write a file relative to `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
  write_bytes(root, rel, content.as_bytes())
}

/// Write raw bytes relative to `root`, creating parent directories.
pub fn write_bytes(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
  let path = root.join(rel);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

/// Every file below `dir` with its content, keyed by POSIX relative path.
pub fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
  WalkDir::new(dir)
    .into_iter()
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .map(|e| {
      let rel = to_posix(e.path().strip_prefix(dir).unwrap());
      (rel, fs::read(e.path()).unwrap())
    })
    .collect()
}
