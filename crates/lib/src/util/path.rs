//! POSIX-style path helpers.
//!
//! File paths flowing through rules, loaders and the manifest are always
//! project-relative strings with `/` separators, whatever the host uses.

use std::path::Path;

/// Convert a host path to a `/`-separated string.
pub fn to_posix(path: &Path) -> String {
  let s = path.to_string_lossy();
  if std::path::MAIN_SEPARATOR == '/' {
    s.into_owned()
  } else {
    s.replace(std::path::MAIN_SEPARATOR, "/")
  }
}

/// Normalize a relative POSIX path without touching the filesystem.
///
/// Resolves `.` and `..` segments, collapses repeated separators and converts
/// backslashes. Returns `None` for absolute paths and for paths that climb above
/// their starting point.
pub fn normalize(path: &str) -> Option<String> {
  let path = path.replace('\\', "/");
  if path.starts_with('/') {
    return None;
  }

  let mut segments: Vec<&str> = Vec::new();
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        segments.pop()?;
      }
      other => segments.push(other),
    }
  }

  Some(segments.join("/"))
}

/// Strip a directory prefix from a POSIX path.
///
/// An empty `dir` is the identity. Returns `None` when `path` is not inside `dir`.
pub fn strip_dir<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
  let dir = dir.trim_end_matches('/');
  if dir.is_empty() {
    return Some(path);
  }
  path.strip_prefix(dir)?.strip_prefix('/')
}

/// Join two POSIX path fragments.
pub fn join(base: &str, rest: &str) -> String {
  let base = base.trim_end_matches('/');
  if base.is_empty() {
    rest.to_string()
  } else if rest.is_empty() {
    base.to_string()
  } else {
    format!("{}/{}", base, rest)
  }
}
