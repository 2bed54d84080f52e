//! Build diagnostics report.
//!
//! The report collects everything a user needs to understand a build after the
//! fact: which packages took part, how dependencies were linked, what every
//! loader said about every file, and the warnings and errors that resulted.
//! It is serialized as JSON with sorted keys, so two identical builds produce
//! identical reports apart from the execution time.

mod logger;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::package::{LinkedDependency, PackageId};
use crate::rules::RuleConfig;

pub use logger::*;

/// Message added once when any loader logged a warning or an error.
pub const LOADER_DIAGNOSTICS_WARNING: &str = "There are errors/warnings for some loaders";

/// Errors writing the report file.
#[derive(Debug, Error)]
pub enum ReportError {
  #[error("failed to serialize report: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write report {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Accumulated diagnostics of one build.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Report {
  pub root: Option<PackageId>,
  pub dependencies: BTreeSet<PackageId>,
  /// Packages reused from a previous build.
  pub clean_packages: BTreeSet<PackageId>,
  pub linked_dependencies: BTreeSet<LinkedDependency>,
  pub rules: Vec<RuleConfig>,
  /// Loader diagnostics keyed by project-relative file path.
  pub files: BTreeMap<String, Vec<LogEntry>>,
  pub warnings: BTreeSet<String>,
  pub errors: Vec<String>,
  pub incremental: bool,
  pub execution_time_ms: Option<u128>,
}

impl Report {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record the rule configuration in effect.
  pub fn rules_run(&mut self, rules: &[RuleConfig]) {
    self.rules = rules.to_vec();
  }

  /// Record a file's loader diagnostics.
  ///
  /// Files that produced no entries are not recorded. Any warning or error
  /// entry adds the loader diagnostics warning.
  pub fn file_logs(&mut self, file: impl Into<String>, entries: Vec<LogEntry>) {
    if entries.is_empty() {
      return;
    }
    if entries.iter().any(|e| e.level >= LogLevel::Warn) {
      self.warn_unique(LOADER_DIAGNOSTICS_WARNING);
    }
    self.files.entry(file.into()).or_default().extend(entries);
  }

  /// Add a warning unless an identical one is already present.
  pub fn warn_unique(&mut self, message: impl Into<String>) {
    self.warnings.insert(message.into());
  }

  pub fn error(&mut self, message: impl Into<String>) {
    self.errors.push(message.into());
  }

  pub fn execution_time(&mut self, elapsed: Duration) {
    self.execution_time_ms = Some(elapsed.as_millis());
  }

  pub fn has_warnings(&self) -> bool {
    !self.warnings.is_empty()
  }

  /// Write the report as pretty JSON, creating parent directories.
  pub fn save(&self, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(self)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|source| ReportError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    fs::write(path, json).map_err(|source| ReportError::Write {
      path: path.to_path_buf(),
      source,
    })?;

    debug!(path = %path.display(), "report written");
    Ok(())
  }
}
