//! Rule matching.
//!
//! A [`RuleMatcher`] is compiled once from the ordered rule configuration.
//! Resolving a path returns the concatenation of the loader chains of every
//! rule whose patterns match it, in configuration order. An empty chain means
//! the file is copied verbatim.
//!
//! Paths are project-relative POSIX strings; `*` never crosses a `/`, while
//! `**` matches any number of directories.

mod types;

use glob::{MatchOptions, Pattern};
use tracing::trace;

use crate::loader::LoaderRegistry;

pub use types::*;

pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

#[derive(Debug)]
struct CompiledRule {
  patterns: Vec<Pattern>,
  exclude: Vec<Pattern>,
  loaders: Vec<LoaderDescriptor>,
}

impl CompiledRule {
  fn matches(&self, path: &str) -> bool {
    self.patterns.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
      && !self.exclude.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
  }
}

/// Maps file paths to loader chains.
#[derive(Debug, Default)]
pub struct RuleMatcher {
  rules: Vec<CompiledRule>,
}

impl RuleMatcher {
  /// Compile `rules`, resolving every loader reference against `registry`.
  ///
  /// Fails on the first invalid pattern or unknown loader id.
  pub fn new(rules: &[RuleConfig], registry: &LoaderRegistry) -> Result<Self, RuleError> {
    let compiled = rules
      .iter()
      .map(|rule| compile(rule, registry))
      .collect::<Result<Vec<_>, _>>()?;

    trace!(count = compiled.len(), "compiled rules");
    Ok(Self { rules: compiled })
  }

  /// Ordered loader chain for `path`.
  pub fn resolve(&self, path: &str) -> Vec<LoaderDescriptor> {
    self
      .rules
      .iter()
      .filter(|rule| rule.matches(path))
      .flat_map(|rule| rule.loaders.iter().cloned())
      .collect()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

fn compile(rule: &RuleConfig, registry: &LoaderRegistry) -> Result<CompiledRule, RuleError> {
  let patterns = compile_patterns(rule.pattern.as_slice())?;
  let exclude = compile_patterns(&rule.exclude)?;

  let loaders = rule
    .loaders
    .iter()
    .map(|reference| {
      let id = reference.id();
      let loader = registry.get(id).ok_or_else(|| RuleError::UnknownLoader {
        id: id.to_string(),
        available: registry.ids().into_iter().map(String::from).collect(),
      })?;
      let options = match reference.options() {
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other.clone(),
      };
      let encoding = loader.metadata().encoding;
      Ok(LoaderDescriptor {
        id: id.to_string(),
        loader,
        options,
        encoding,
      })
    })
    .collect::<Result<Vec<_>, RuleError>>()?;

  Ok(CompiledRule {
    patterns,
    exclude,
    loaders,
  })
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, RuleError> {
  patterns
    .iter()
    .map(|p| {
      Pattern::new(p).map_err(|source| RuleError::InvalidPattern {
        pattern: p.clone(),
        source,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::loader::Encoding;

  fn matcher(json: &str) -> Result<RuleMatcher, RuleError> {
    let rules: Vec<RuleConfig> = serde_json::from_str(json).unwrap();
    RuleMatcher::new(&rules, &LoaderRegistry::with_builtins())
  }

  fn ids(chain: &[LoaderDescriptor]) -> Vec<&str> {
    chain.iter().map(|d| d.id.as_str()).collect()
  }

  #[test]
  fn concatenates_matching_rules_in_order() {
    let m = matcher(
      r#"[
        { "pattern": "src/**/*.css", "loaders": ["css"] },
        { "pattern": ["**/*.png", "**/*.css"], "loaders": ["remove-hash"] },
        { "pattern": "**/*.json", "loaders": ["json"] }
      ]"#,
    )
    .unwrap();

    assert_eq!(ids(&m.resolve("src/deep/widget.css")), vec!["css", "remove-hash"]);
    assert_eq!(ids(&m.resolve("lib/widget.css")), vec!["remove-hash"]);
    assert!(m.resolve("src/index.js").is_empty());
  }

  #[test]
  fn resolve_is_deterministic() {
    let m = matcher(r#"[{ "pattern": "**/*.css", "loaders": ["css", "remove-hash"] }]"#).unwrap();
    let first = ids(&m.resolve("src/a.css")).join(",");
    for _ in 0..10 {
      assert_eq!(ids(&m.resolve("src/a.css")).join(","), first);
    }
  }

  #[test]
  fn single_star_does_not_cross_directories() {
    let m = matcher(r#"[{ "pattern": "src/*.css", "loaders": ["css"] }]"#).unwrap();
    assert_eq!(m.resolve("src/a.css").len(), 1);
    assert!(m.resolve("src/nested/a.css").is_empty());
  }

  #[test]
  fn exclude_removes_matches() {
    let m = matcher(r#"[{ "pattern": "**/*.json", "exclude": ["**/package.json"], "loaders": ["json"] }]"#).unwrap();
    assert_eq!(m.resolve("src/data.json").len(), 1);
    assert!(m.resolve("package.json").is_empty());
    assert!(m.resolve("node_modules/foo/package.json").is_empty());
  }

  #[test]
  fn options_and_encoding_are_carried() {
    let m = matcher(
      r#"[{
        "pattern": "**/*",
        "loaders": [{ "loader": "css", "options": { "keep-content": false } }, "remove-hash"]
      }]"#,
    )
    .unwrap();
    let chain = m.resolve("src/a.css");

    assert_eq!(chain[0].options["keep-content"], false);
    assert_eq!(chain[0].encoding, Some(Encoding::Utf8));
    assert_eq!(chain[1].options, serde_json::json!({}));
    assert_eq!(chain[1].encoding, None);
  }

  #[test]
  fn unknown_loader_fails_fast() {
    let err = matcher(r#"[{ "pattern": "**/*.js", "loaders": ["babel"] }]"#).unwrap_err();
    assert!(matches!(err, RuleError::UnknownLoader { ref id, .. } if id == "babel"));
    assert!(err.to_string().contains("available: css, json, remove-hash, sfc"));
  }

  #[test]
  fn invalid_pattern_fails() {
    let err = matcher(r#"[{ "pattern": "src/[", "loaders": ["css"] }]"#).unwrap_err();
    assert!(matches!(err, RuleError::InvalidPattern { .. }));
  }
}
