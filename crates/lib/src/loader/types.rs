//! Loader interface types.
//!
//! A loader is one stage of a file's transform chain. Each invocation receives
//! an immutable [`LoaderContext`] and answers with a [`LoaderOutput`] record;
//! the transform engine merges that record into the file's state before the
//! next stage runs, so loaders never mutate shared state in place.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use super::encoding::Encoding;
use crate::report::PluginLogger;

/// File content as seen by a loader.
///
/// Loaders declaring a text encoding receive and must return `Text`; binary
/// loaders receive and must return `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
  Bytes(Vec<u8>),
  Text(String),
}

impl Content {
  /// Borrow as text, if this is text content.
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Content::Text(s) => Some(s),
      Content::Bytes(_) => None,
    }
  }

  /// Borrow as bytes, if this is binary content.
  pub fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      Content::Bytes(b) => Some(b),
      Content::Text(_) => None,
    }
  }

  /// Human-readable kind, for error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Content::Bytes(_) => "binary",
      Content::Text(_) => "text",
    }
  }
}

impl From<String> for Content {
  fn from(s: String) -> Self {
    Content::Text(s)
  }
}

impl From<&str> for Content {
  fn from(s: &str) -> Self {
    Content::Text(s.to_string())
  }
}

impl From<Vec<u8>> for Content {
  fn from(b: Vec<u8>) -> Self {
    Content::Bytes(b)
  }
}

/// Static description of a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderMetadata {
  /// Encoding the loader wants its content in; `None` means raw bytes.
  pub encoding: Option<Encoding>,
}

impl Default for LoaderMetadata {
  fn default() -> Self {
    Self {
      encoding: Some(Encoding::Utf8),
    }
  }
}

impl LoaderMetadata {
  /// Metadata for a loader working on raw bytes.
  pub fn binary() -> Self {
    Self { encoding: None }
  }
}

/// Input record handed to a loader.
#[derive(Debug)]
pub struct LoaderContext<'a> {
  /// Project-relative POSIX path of the file being transformed.
  pub file_path: &'a str,
  /// Current primary content, `None` if an earlier stage removed it.
  pub content: Option<&'a Content>,
  /// Extra artifacts recorded by earlier stages, keyed by project-relative path.
  pub extra_artifacts: &'a BTreeMap<String, Content>,
  /// Diagnostics sink for this file.
  pub log: &'a PluginLogger,
}

impl LoaderContext<'_> {
  /// Primary content as text, for loaders declaring a text encoding.
  pub fn text(&self) -> Option<&str> {
    self.content.and_then(Content::as_text)
  }

  /// Primary content as bytes, for binary loaders.
  pub fn bytes(&self) -> Option<&[u8]> {
    self.content.and_then(Content::as_bytes)
  }
}

/// What a stage did to the primary content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentChange {
  /// Leave the content as it was.
  #[default]
  Keep,
  /// Replace the content.
  Replace(Content),
  /// Drop the primary content; only extra artifacts will be written.
  Remove,
}

/// A new source file synthesized by a loader.
///
/// It is run through its own matched rules, and written, before the stage that
/// emitted it is considered complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
  /// Project-relative POSIX path inside the current package.
  pub path: String,
  pub content: Vec<u8>,
}

/// Output record of a loader invocation.
#[derive(Debug, Clone, Default)]
pub struct LoaderOutput {
  pub content: ContentChange,
  /// Artifacts to set (`Some`) or discard (`None`), keyed by project-relative path.
  pub extra_artifacts: BTreeMap<String, Option<Content>>,
  pub virtual_files: Vec<VirtualFile>,
}

impl LoaderOutput {
  /// No change at all.
  pub fn unchanged() -> Self {
    Self::default()
  }

  /// Replace the primary content.
  pub fn with_content(mut self, content: impl Into<Content>) -> Self {
    self.content = ContentChange::Replace(content.into());
    self
  }

  /// Drop the primary content.
  pub fn without_content(mut self) -> Self {
    self.content = ContentChange::Remove;
    self
  }

  /// Record an extra artifact.
  pub fn with_artifact(mut self, path: impl Into<String>, content: impl Into<Content>) -> Self {
    self.extra_artifacts.insert(path.into(), Some(content.into()));
    self
  }

  /// Discard an artifact recorded by an earlier stage.
  pub fn without_artifact(mut self, path: impl Into<String>) -> Self {
    self.extra_artifacts.insert(path.into(), None);
    self
  }

  /// Request that a synthesized file be run through the pipeline.
  pub fn with_virtual_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
    self.virtual_files.push(VirtualFile {
      path: path.into(),
      content: content.into(),
    });
    self
  }
}

/// A structured build error raised by a loader.
///
/// Carries what was being done (`action_in_progress`, starting lowercase) and
/// one or more descriptions of what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.action_in_progress, .descriptions))]
pub struct LoaderError {
  action_in_progress: String,
  descriptions: Vec<String>,
}

fn render(action: &str, descriptions: &[String]) -> String {
  match descriptions {
    [single] => format!("Build error while {}: {}", action, single),
    many => {
      let lines: Vec<String> = many.iter().map(|d| format!("  · {}", d)).collect();
      format!("Build errors while {}:\n{}", action, lines.join("\n"))
    }
  }
}

impl LoaderError {
  pub fn new(action_in_progress: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      action_in_progress: action_in_progress.into(),
      descriptions: vec![description.into()],
    }
  }

  pub fn with_descriptions(action_in_progress: impl Into<String>, descriptions: Vec<String>) -> Self {
    Self {
      action_in_progress: action_in_progress.into(),
      descriptions,
    }
  }

  pub fn action_in_progress(&self) -> &str {
    &self.action_in_progress
  }

  pub fn descriptions(&self) -> &[String] {
    &self.descriptions
  }

  /// Append the loader identity to the action in progress.
  pub fn in_loader(mut self, loader_id: &str) -> Self {
    self.action_in_progress = format!("{} in '{}'", self.action_in_progress, loader_id);
    self
  }
}

/// A transform stage.
///
/// Implementations must be stateless with respect to individual files: the
/// same loader instance runs concurrently for many files.
#[async_trait]
pub trait Loader: Send + Sync {
  /// Static metadata; defaults to UTF-8 text content.
  fn metadata(&self) -> LoaderMetadata {
    LoaderMetadata::default()
  }

  /// Transform one file.
  ///
  /// `options` is the configured options object, passed through unmodified
  /// (an empty object when none was configured).
  async fn exec(&self, ctx: &LoaderContext<'_>, options: &serde_json::Value) -> Result<LoaderOutput, LoaderError>;
}
