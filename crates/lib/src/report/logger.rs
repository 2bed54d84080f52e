//! Per-file diagnostics sink handed to loaders.

use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

/// Severity of a loader diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Info,
  Warn,
  Error,
}

/// One diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
  pub level: LogLevel,
  /// Tag of whoever logged it, usually the loader id.
  pub source: String,
  pub messages: Vec<String>,
}

/// Collects diagnostics for a single file.
///
/// Entries keep insertion order. Every entry is also mirrored to `tracing` at
/// debug level.
#[derive(Debug, Default)]
pub struct PluginLogger {
  file: String,
  entries: Mutex<Vec<LogEntry>>,
}

impl PluginLogger {
  pub fn new(file: impl Into<String>) -> Self {
    Self {
      file: file.into(),
      entries: Mutex::new(Vec::new()),
    }
  }

  pub fn info(&self, source: &str, message: impl Into<String>) {
    self.push(LogLevel::Info, source, vec![message.into()]);
  }

  pub fn warn(&self, source: &str, message: impl Into<String>) {
    self.push(LogLevel::Warn, source, vec![message.into()]);
  }

  pub fn error(&self, source: &str, message: impl Into<String>) {
    self.push(LogLevel::Error, source, vec![message.into()]);
  }

  /// Record a multi-message entry.
  pub fn push(&self, level: LogLevel, source: &str, messages: Vec<String>) {
    debug!(file = %self.file, source, ?level, "{}", messages.join(" "));
    let entry = LogEntry {
      level,
      source: source.to_string(),
      messages,
    };
    self.lock().push(entry);
  }

  /// Take the recorded entries, leaving the logger empty.
  pub fn take(&self) -> Vec<LogEntry> {
    std::mem::take(&mut *self.lock())
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
    // Entries are plain data; a panic while holding the lock cannot break them.
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
