//! Hashing utilities for change detection.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hash
//! - `Hashable`: Hash any serializable value through its JSON form
//! - `hash_files()`: Deterministic fingerprint of a set of files
//! - `hash_file()`: Single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Values whose identity is the hash of their JSON serialization.
///
/// Only use this for types that serialize deterministically (ordered maps,
/// no floating timestamps).
pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ContentHash, serde_json::Error> {
    let serialized = serde_json::to_string(self)?;
    Ok(hash_bytes(serialized.as_bytes()))
  }
}

/// Error during file hashing.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },
}

/// Compute a deterministic fingerprint of a set of files.
///
/// `files` are paths relative to `root` using `/` separators. The hash covers
/// each relative path and the content of the file behind it, never metadata
/// such as timestamps, so identical checkouts hash identically.
///
/// Entries are sorted by path for determinism.
pub fn hash_files(root: &Path, files: &[String]) -> Result<ContentHash, HashError> {
  let mut sorted: Vec<&String> = files.iter().collect();
  sorted.sort();
  sorted.dedup();

  let mut hasher = Sha256::new();
  for rel_path in sorted {
    let content_hash = hash_file(&root.join(rel_path))?;
    hasher.update(format!("F:{}:{}", rel_path, content_hash.0).as_bytes());
    hasher.update(b"\n");
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let mut file = fs::File::open(path).map_err(|e| HashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(|e| HashError::ReadFile {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
