//! npm-style version ranges on top of `semver`.
//!
//! `semver::VersionReq` speaks Cargo's dialect, where a bare `1.2.3` means
//! `^1.2.3` and comparators are comma separated. npm ranges are translated
//! first: `||` alternatives, whitespace-separated comparators, hyphen ranges,
//! bare exact versions and `v` prefixes. Anything that still does not parse
//! (`file:`, `link:`, git URLs, dist-tags) is a linked range.

use std::fmt;

use semver::{Version, VersionReq};

/// A parsed dependency range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
  /// `*`, `x` or empty: any version.
  Any,
  /// One requirement per `||` alternative.
  Semver(Vec<VersionReq>),
  /// Not a version range; the raw specifier is kept.
  Linked(String),
}

impl VersionRange {
  pub fn parse(range: &str) -> Self {
    let mut alternatives = Vec::new();

    for alternative in range.split("||") {
      let alternative = alternative.trim();
      if matches!(alternative, "" | "*" | "x" | "X") {
        return VersionRange::Any;
      }
      match translate(alternative).and_then(|req| VersionReq::parse(&req).ok()) {
        Some(req) => alternatives.push(req),
        None => return VersionRange::Linked(range.trim().to_string()),
      }
    }

    VersionRange::Semver(alternatives)
  }

  /// Whether `version` satisfies the range. Linked ranges match nothing.
  pub fn matches(&self, version: &Version) -> bool {
    match self {
      VersionRange::Any => true,
      VersionRange::Semver(alternatives) => alternatives.iter().any(|req| req.matches(version)),
      VersionRange::Linked(_) => false,
    }
  }

  pub fn is_linked(&self) -> bool {
    matches!(self, VersionRange::Linked(_))
  }
}

impl fmt::Display for VersionRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionRange::Any => f.write_str("*"),
      VersionRange::Semver(alternatives) => {
        let parts: Vec<String> = alternatives.iter().map(|r| r.to_string()).collect();
        f.write_str(&parts.join(" || "))
      }
      VersionRange::Linked(raw) => f.write_str(raw),
    }
  }
}

/// Translate one npm alternative into `semver` syntax.
fn translate(alternative: &str) -> Option<String> {
  let tokens: Vec<&str> = alternative.split_whitespace().collect();

  if let [low, "-", high] = tokens.as_slice() {
    return Some(format!(">={}, <={}", strip_v(low), strip_v(high)));
  }

  let mut comparators = Vec::new();
  let mut pending_op: Option<&str> = None;
  for token in tokens {
    if token.chars().all(|c| "<>=~^".contains(c)) {
      pending_op = Some(token);
      continue;
    }
    let comparator = match pending_op.take() {
      Some(op) => format!("{}{}", op, token),
      None => token.to_string(),
    };
    comparators.push(comparator_to_semver(&comparator)?);
  }
  if pending_op.is_some() || comparators.is_empty() {
    return None;
  }

  Some(comparators.join(", "))
}

fn comparator_to_semver(comparator: &str) -> Option<String> {
  let split = comparator.find(|c: char| !"<>=~^".contains(c))?;
  let (op, version) = comparator.split_at(split);
  let version = strip_v(version);

  if !version.starts_with(|c: char| c.is_ascii_digit() || "xX*".contains(c)) {
    return None;
  }

  let op = if !op.is_empty() {
    op
  } else if version.contains(['x', 'X', '*']) {
    ""
  } else if version.split('.').count() >= 3 {
    "="
  } else {
    "~"
  };

  Some(format!("{}{}", op, version))
}

fn strip_v(version: &str) -> &str {
  version.strip_prefix(['v', 'V']).unwrap_or(version)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
  }

  fn satisfies(range: &str, version: &str) -> bool {
    VersionRange::parse(range).matches(&v(version))
  }

  #[test]
  fn caret_and_tilde() {
    assert!(satisfies("^1.0.0", "1.2.0"));
    assert!(!satisfies("^1.0.0", "2.0.0"));
    assert!(satisfies("~1.2.0", "1.2.9"));
    assert!(!satisfies("~1.2.0", "1.3.0"));
  }

  #[test]
  fn bare_versions_are_exact_or_partial() {
    assert!(satisfies("1.2.3", "1.2.3"));
    assert!(!satisfies("1.2.3", "1.2.4"));
    assert!(satisfies("1.2", "1.2.7"));
    assert!(!satisfies("1.2", "1.3.0"));
    assert!(satisfies("1.x", "1.9.0"));
    assert!(satisfies("v2.0.0", "2.0.0"));
  }

  #[test]
  fn whitespace_comparators_and_alternatives() {
    assert!(satisfies(">=1.0.0 <2.0.0", "1.5.0"));
    assert!(!satisfies(">= 1.0.0 < 2.0.0", "2.0.0"));
    assert!(satisfies("^1.0.0 || ^3.0.0", "3.1.0"));
    assert!(!satisfies("^1.0.0 || ^3.0.0", "2.1.0"));
  }

  #[test]
  fn hyphen_ranges() {
    assert!(satisfies("1.0.0 - 2.0.0", "2.0.0"));
    assert!(!satisfies("1.0.0 - 2.0.0", "2.0.1"));
  }

  #[test]
  fn any_and_linked() {
    assert_eq!(VersionRange::parse("*"), VersionRange::Any);
    assert_eq!(VersionRange::parse(""), VersionRange::Any);
    assert!(VersionRange::parse("file:../local").is_linked());
    assert!(VersionRange::parse("link:foo").is_linked());
    assert!(VersionRange::parse("github:user/repo#main").is_linked());
    assert!(VersionRange::parse("latest").is_linked());
    assert!(!satisfies("file:../local", "1.0.0"));
  }
}
