use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::{BuildManifest, ManifestError, ManifestLoad, Partition, PackageState};
use crate::package::{PackageId, ResolutionError, ResolvedPackages};
use crate::project::ConfigError;
use crate::report::{Report, ReportError};
use crate::rules::RuleError;
use crate::transform::TransformError;
use crate::util::hash::{ContentHash, HashError};

/// Options for a bundle run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleOptions {
  /// Ignore the manifest and reprocess every package.
  pub full: bool,
}

/// Everything decided before any file is processed.
#[derive(Debug)]
pub struct BuildPlan {
  pub resolved: ResolvedPackages,
  /// Project-relative files of every package.
  pub files: BTreeMap<PackageId, Vec<String>>,
  /// Current state of every package.
  pub states: BTreeMap<PackageId, PackageState>,
  pub partition: Partition,
  /// How the previous manifest was obtained.
  pub manifest_load: ManifestLoad,
  /// The manifest the partition was computed against.
  pub previous: BuildManifest,
  pub config_hash: ContentHash,
}

impl BuildPlan {
  /// Whether the previous build's output is being reused.
  pub fn is_incremental(&self) -> bool {
    matches!(self.manifest_load, ManifestLoad::Loaded(_))
  }

  /// Number of files that will be processed.
  pub fn dirty_file_count(&self) -> usize {
    self
      .partition
      .dirty
      .iter()
      .map(|p| self.files.get(&p.id).map_or(0, Vec::len))
      .sum()
  }
}

/// Result of a successful bundle run.
#[derive(Debug)]
pub struct BundleOutcome {
  pub report: Report,
  /// Packages whose files were processed.
  pub processed: Vec<PackageId>,
  /// Packages whose previous output was reused.
  pub reused: Vec<PackageId>,
  pub files: usize,
  pub written: usize,
  pub incremental: bool,
  /// Where the report was written, if anywhere.
  pub report_file: Option<PathBuf>,
}

/// Errors that abort a bundle run.
#[derive(Debug, Error)]
pub enum BundleError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Resolution(#[from] ResolutionError),

  #[error(transparent)]
  Rules(#[from] RuleError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Report(#[from] ReportError),

  #[error("failed to fingerprint package {package}: {source}")]
  Hash {
    package: PackageId,
    #[source]
    source: HashError,
  },

  #[error("failed to fingerprint configuration: {0}")]
  Fingerprint(#[source] serde_json::Error),

  #[error("failed to list files of {package} in {path}: {source}")]
  Scan {
    package: PackageId,
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to clear {path}: {source}")]
  Clear {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Every file failure of the run, collected after all files finished.
  #[error("{} file(s) failed to build", .errors.len())]
  Transform {
    errors: Vec<TransformError>,
    report: Box<Report>,
  },
}
