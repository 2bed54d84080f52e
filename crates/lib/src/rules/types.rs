//! Rule configuration and compiled rule types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::{Encoding, Loader};

/// One or more glob patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
  One(String),
  Many(Vec<String>),
}

impl Patterns {
  pub fn as_slice(&self) -> &[String] {
    match self {
      Patterns::One(p) => std::slice::from_ref(p),
      Patterns::Many(ps) => ps,
    }
  }
}

/// Reference to a loader in a rule, either a bare id or an id with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoaderRef {
  Name(String),
  Full {
    loader: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    options: serde_json::Value,
  },
}

impl LoaderRef {
  pub fn id(&self) -> &str {
    match self {
      LoaderRef::Name(id) => id,
      LoaderRef::Full { loader, .. } => loader,
    }
  }

  /// Configured options; `null` when none were given.
  pub fn options(&self) -> &serde_json::Value {
    static NULL: serde_json::Value = serde_json::Value::Null;
    match self {
      LoaderRef::Name(_) => &NULL,
      LoaderRef::Full { options, .. } => options,
    }
  }
}

/// A configured rule: files matching `pattern` (and no `exclude` glob) run
/// through `loaders` in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
  pub pattern: Patterns,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exclude: Vec<String>,
  pub loaders: Vec<LoaderRef>,
}

/// A loader stage resolved against the registry.
#[derive(Clone)]
pub struct LoaderDescriptor {
  pub id: String,
  pub loader: Arc<dyn Loader>,
  /// Options passed through to the loader unmodified (an empty object if none).
  pub options: serde_json::Value,
  /// Declared content encoding; `None` for binary loaders.
  pub encoding: Option<Encoding>,
}

impl std::fmt::Debug for LoaderDescriptor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LoaderDescriptor")
      .field("id", &self.id)
      .field("options", &self.options)
      .field("encoding", &self.encoding)
      .finish()
  }
}

/// Errors compiling the rule configuration.
#[derive(Debug, Error)]
pub enum RuleError {
  #[error("invalid pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("unknown loader '{id}' (available: {})", .available.join(", "))]
  UnknownLoader { id: String, available: Vec<String> },
}
