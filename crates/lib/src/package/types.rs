use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::path::to_posix;

/// Package identity: `name@version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub String);

impl PackageId {
  pub fn new(name: &str, version: &str) -> Self {
    Self(format!("{}@{}", name, version))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for PackageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Identity and location of one participating package.
///
/// Descriptors are immutable; `with_*` methods derive new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
  pub id: PackageId,
  pub name: String,
  pub version: String,
  /// Package directory: project-relative for source packages, absolute for
  /// destination packages.
  pub dir: PathBuf,
  pub is_root: bool,
  /// Whether a previous build's output can be reused.
  pub clean: bool,
}

impl PackageDescriptor {
  pub fn new(name: &str, version: &str, dir: impl Into<PathBuf>, is_root: bool) -> Self {
    Self {
      id: PackageId::new(name, version),
      name: name.to_string(),
      version: version.to_string(),
      dir: dir.into(),
      is_root,
      clean: false,
    }
  }

  /// Same package, located at `dir`.
  pub fn with_dir(&self, dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      ..self.clone()
    }
  }

  /// Same package, with the given clean flag.
  pub fn with_clean(&self, clean: bool) -> Self {
    Self { clean, ..self.clone() }
  }

  /// Directory as a POSIX string.
  pub fn posix_dir(&self) -> String {
    to_posix(&self.dir)
  }

  /// Name of the package's directory in the output tree.
  ///
  /// `/` in scoped names is escaped so every package is a single directory.
  pub fn target_dir_name(&self) -> String {
    format!("{}@{}", self.name, self.version).replace('/', "%2F")
  }
}

/// The fields of `package.json` the resolver cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
  pub name: String,
  #[serde(default = "default_version")]
  pub version: String,
  #[serde(default)]
  pub dependencies: BTreeMap<String, String>,
  #[serde(default)]
  pub peer_dependencies: BTreeMap<String, String>,
}

fn default_version() -> String {
  "0.0.0".to_string()
}

impl PackageJson {
  pub fn read(path: &Path) -> Result<Self, ResolutionError> {
    let content = fs::read_to_string(path).map_err(|source| ResolutionError::ReadPackage {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ResolutionError::ParsePackage {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Kind of a resolved dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
  Regular,
  Peer,
}

/// A dependency declared with a non-semver range (`file:`, `link:`, git URL...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LinkedDependency {
  pub requester: PackageId,
  pub name: String,
  pub range: String,
  pub resolved: PackageId,
}

/// A non-fatal resolution problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
  pub consumer: PackageId,
  pub peer: String,
  pub range: String,
  /// Candidates satisfying the range.
  pub matches: Vec<PackageId>,
  /// Number of installed candidates considered.
  pub candidates: usize,
}

impl fmt::Display for ResolutionWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let verdict = if self.matches.is_empty() {
      "could not be resolved"
    } else {
      "is ambiguous"
    };
    write!(
      f,
      "Peer dependency {}@{} of {} {}: {} out of {} candidates match",
      self.peer,
      self.range,
      self.consumer,
      verdict,
      self.matches.len(),
      self.candidates
    )?;
    if !self.matches.is_empty() {
      let ids: Vec<&str> = self.matches.iter().map(|m| m.as_str()).collect();
      write!(f, " ({})", ids.join(", "))?;
    }
    Ok(())
  }
}

/// Fatal resolution errors.
#[derive(Debug, Error)]
pub enum ResolutionError {
  #[error("failed to read {path}: {source}")]
  ReadPackage {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  ParsePackage {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error(
    "{requester} depends on {dependency}@{range}, but no installed version satisfies it (installed: {})",
    installed_list(.candidates)
  )]
  Unsatisfied {
    requester: PackageId,
    dependency: String,
    range: String,
    candidates: Vec<String>,
  },

  #[error("failed to scan {path}: {message}")]
  Scan { path: PathBuf, message: String },
}

fn installed_list(candidates: &[String]) -> String {
  if candidates.is_empty() {
    "none".to_string()
  } else {
    candidates.join(", ")
  }
}
