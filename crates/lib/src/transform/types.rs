use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::{EncodingError, LoaderError};
use crate::report::LogEntry;

/// A successfully processed source file.
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
  /// Project-relative path of the source file.
  pub file: String,
  /// Absolute paths written, including those of virtual files.
  pub written: Vec<PathBuf>,
  /// Loader diagnostics, keyed by the file (or virtual file) they concern.
  pub logs: BTreeMap<String, Vec<LogEntry>>,
}

/// A source file whose processing failed.
#[derive(Debug)]
pub struct FileFailure {
  pub error: TransformError,
  pub logs: BTreeMap<String, Vec<LogEntry>>,
}

/// Errors processing a single file.
#[derive(Debug, Error)]
pub enum TransformError {
  /// A loader raised a build error.
  #[error("{file}: {source}")]
  Loader {
    file: String,
    loader: String,
    #[source]
    source: LoaderError,
  },

  #[error("{file}: loader '{loader}' returned {actual} content but declares {expected} content")]
  ContentKind {
    file: String,
    loader: String,
    expected: &'static str,
    actual: &'static str,
  },

  #[error("{file}: loader '{loader}' produced text that cannot be encoded: {source}")]
  Encoding {
    file: String,
    loader: String,
    #[source]
    source: EncodingError,
  },

  #[error("{file}: output path '{path}' is outside its package")]
  OutsidePackage { file: String, path: String },

  #[error("{file}: virtual file '{path}' was already emitted")]
  AlreadyEmitted { file: String, path: String },

  #[error("{file}: virtual files nested deeper than {depth} levels")]
  TooDeep { file: String, depth: usize },

  #[error("{file}: failed to read {path}: {source}")]
  Read {
    file: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{file}: failed to write {path}: {source}")]
  Write {
    file: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{file}: processing task failed: {message}")]
  Task { file: String, message: String },
}

impl TransformError {
  /// Project-relative path of the file being processed.
  pub fn file(&self) -> &str {
    match self {
      TransformError::Loader { file, .. }
      | TransformError::ContentKind { file, .. }
      | TransformError::Encoding { file, .. }
      | TransformError::OutsidePackage { file, .. }
      | TransformError::AlreadyEmitted { file, .. }
      | TransformError::TooDeep { file, .. }
      | TransformError::Read { file, .. }
      | TransformError::Write { file, .. }
      | TransformError::Task { file, .. } => file,
    }
  }
}
