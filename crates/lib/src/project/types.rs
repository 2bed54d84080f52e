//! Project configuration types.
//!
//! The configuration file (`bundler.json`) is optional; every key has a default.
//!
//! # File Format
//!
//! ```json
//! {
//!   "sources": ["src", "assets"],
//!   "output": "build",
//!   "max-parallel-files": 64,
//!   "rules": [
//!     { "pattern": "**/*.css", "loaders": [{ "loader": "css", "options": { "keep-content": false } }] },
//!     { "pattern": ["**/*.json"], "exclude": ["**/package.json"], "loaders": ["json"] }
//!   ],
//!   "exclude": { "*": ["test/**"], "lodash": ["*.md"] },
//!   "report-file": "bundler-report.json"
//! }
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_MAX_PARALLEL_FILES, DEFAULT_OUTPUT_DIR, DEFAULT_SOURCES};
use crate::rules::RuleConfig;

/// Raw contents of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ProjectFile {
  /// Source locations of the root package (directories or single files).
  pub sources: Vec<String>,
  /// Output directory, relative to the project root unless absolute.
  pub output: String,
  /// Maximum number of files processed concurrently.
  pub max_parallel_files: usize,
  /// Ordered rule list.
  pub rules: Vec<RuleConfig>,
  /// Package-relative globs to skip, keyed by package name (`*` for all packages).
  pub exclude: BTreeMap<String, Vec<String>>,
  /// Whether dependency packages take part in the build at all.
  pub include_dependencies: bool,
  /// Build manifest location (defaults to a file inside the output directory).
  pub manifest: Option<String>,
  /// Where to write the JSON diagnostics report, if anywhere.
  pub report_file: Option<String>,
  /// Verbose progress output.
  pub verbose: bool,
}

impl Default for ProjectFile {
  fn default() -> Self {
    Self {
      sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
      output: DEFAULT_OUTPUT_DIR.to_string(),
      max_parallel_files: DEFAULT_MAX_PARALLEL_FILES,
      rules: Vec::new(),
      exclude: BTreeMap::new(),
      include_dependencies: true,
      manifest: None,
      report_file: None,
      verbose: false,
    }
  }
}

/// Values that override the configuration file, typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub output: Option<PathBuf>,
  pub max_parallel_files: Option<usize>,
  pub report_file: Option<PathBuf>,
  pub verbose: Option<bool>,
}

/// Errors that can occur while loading the project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The project directory does not exist or cannot be canonicalized.
  #[error("project directory {path} is not accessible: {source}")]
  ProjectDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to read the configuration file.
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The configuration file is not valid JSON or has unknown keys.
  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// A configuration value is out of range.
  #[error("invalid configuration: {0}")]
  Invalid(String),
}
