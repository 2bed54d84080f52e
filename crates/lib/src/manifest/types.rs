use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::package::{PackageDescriptor, PackageId};
use crate::util::hash::ContentHash;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Persisted incremental-build state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildManifest {
  pub version: u32,
  /// Hash of the configuration the recorded outputs were built with.
  pub config_hash: ContentHash,
  pub packages: BTreeMap<PackageId, ManifestEntry>,
}

/// State of one package at its last successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
  /// Fingerprint of the package's source files.
  pub fingerprint: ContentHash,
  /// Resolved dependency edges, keyed by declared name.
  pub dependencies: BTreeMap<String, PackageId>,
}

/// The current state of a package, compared against its manifest entry.
pub type PackageState = ManifestEntry;

/// Result of reading the manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLoad {
  /// No manifest on disk.
  Absent,
  Loaded(BuildManifest),
  /// A manifest exists but cannot be trusted (unreadable, corrupt, other
  /// format version or other configuration).
  Discarded { reason: String },
}

/// Packages split by whether their previous output can be reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
  pub clean: Vec<PackageDescriptor>,
  pub dirty: Vec<PackageDescriptor>,
}

/// Errors writing or removing the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to serialize manifest: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write manifest {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove manifest {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}
