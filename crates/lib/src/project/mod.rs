//! Project configuration.
//!
//! [`ProjectConfig`] is an immutable value built once at startup from the
//! project directory and its optional `bundler.json`. Components receive it at
//! construction instead of consulting any process-wide state.

mod types;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::consts::{CONFIG_FILENAME, MANIFEST_FILENAME};
use crate::rules::RuleConfig;
use crate::util::hash::{ContentHash, Hashable};
use crate::util::path::normalize;

pub use types::*;

/// Resolved, immutable project configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
  /// Absolute project root.
  pub dir: PathBuf,
  /// Normalized, project-relative source locations of the root package.
  pub sources: Vec<String>,
  /// Absolute output directory.
  pub output: PathBuf,
  /// Maximum number of files processed concurrently across all packages.
  pub max_parallel_files: usize,
  /// Ordered rule list.
  pub rules: Vec<RuleConfig>,
  /// Package-relative exclusion globs, keyed by package name or `*`.
  pub exclude: BTreeMap<String, Vec<String>>,
  /// Whether dependency packages take part in the build.
  pub include_dependencies: bool,
  /// Absolute path of the build manifest.
  pub manifest_path: PathBuf,
  /// Absolute path of the JSON report, if requested.
  pub report_file: Option<PathBuf>,
  /// Verbose progress output.
  pub verbose: bool,
}

/// The configuration subset whose change invalidates every previous output.
#[derive(Serialize)]
struct Fingerprint<'a> {
  sources: &'a [String],
  output: String,
  rules: &'a [RuleConfig],
  exclude: &'a BTreeMap<String, Vec<String>>,
  include_dependencies: bool,
}

impl Hashable for Fingerprint<'_> {}

impl ProjectConfig {
  /// Load the configuration of the project rooted at `dir`.
  ///
  /// A missing `bundler.json` yields the defaults; an unreadable or malformed
  /// one is an error.
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    let dir = dunce::canonicalize(dir).map_err(|source| ConfigError::ProjectDir {
      path: dir.to_path_buf(),
      source,
    })?;

    let config_path = dir.join(CONFIG_FILENAME);
    let file = match fs::read_to_string(&config_path) {
      Ok(content) => serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %config_path.display(), "no configuration file, using defaults");
        ProjectFile::default()
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: config_path,
          source,
        });
      }
    };

    Self::from_file(dir, file)
  }

  /// Build a configuration from already-parsed file contents.
  ///
  /// `dir` must be absolute.
  pub fn from_file(dir: PathBuf, file: ProjectFile) -> Result<Self, ConfigError> {
    if file.max_parallel_files == 0 {
      return Err(ConfigError::Invalid("max-parallel-files must be at least 1".to_string()));
    }

    let mut sources = Vec::with_capacity(file.sources.len());
    for source in &file.sources {
      match normalize(source) {
        Some(s) if !s.is_empty() => sources.push(s),
        _ => {
          return Err(ConfigError::Invalid(format!(
            "source '{}' must be a non-empty path inside the project",
            source
          )));
        }
      }
    }

    let output = dir.join(&file.output);
    let manifest_path = match &file.manifest {
      Some(manifest) => dir.join(manifest),
      None => output.join(MANIFEST_FILENAME),
    };
    let report_file = file.report_file.as_ref().map(|p| dir.join(p));

    Ok(Self {
      dir,
      sources,
      output,
      max_parallel_files: file.max_parallel_files,
      rules: file.rules,
      exclude: file.exclude,
      include_dependencies: file.include_dependencies,
      manifest_path,
      report_file,
      verbose: file.verbose,
    })
  }

  /// Return a new configuration with the given overrides applied.
  pub fn with_overrides(&self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
    let mut config = self.clone();

    if let Some(output) = overrides.output {
      let output = config.dir.join(output);
      // A manifest that lived in the old output directory follows it.
      if config.manifest_path == config.output.join(MANIFEST_FILENAME) {
        config.manifest_path = output.join(MANIFEST_FILENAME);
      }
      config.output = output;
    }

    if let Some(max) = overrides.max_parallel_files {
      if max == 0 {
        return Err(ConfigError::Invalid("max-parallel-files must be at least 1".to_string()));
      }
      config.max_parallel_files = max;
    }

    if let Some(report_file) = overrides.report_file {
      config.report_file = Some(config.dir.join(report_file));
    }

    if let Some(verbose) = overrides.verbose {
      config.verbose = verbose;
    }

    Ok(config)
  }

  /// Hash of every setting that affects what ends up in the output tree.
  pub fn fingerprint(&self) -> Result<ContentHash, serde_json::Error> {
    Fingerprint {
      sources: &self.sources,
      output: self.output.to_string_lossy().into_owned(),
      rules: &self.rules,
      exclude: &self.exclude,
      include_dependencies: self.include_dependencies,
    }
    .compute_hash()
  }

  /// Exclusion globs that apply to a package with the given name.
  pub fn excludes_for(&self, package_name: &str) -> Vec<&str> {
    ["*", package_name]
      .iter()
      .filter_map(|key| self.exclude.get(*key))
      .flatten()
      .map(|s| s.as_str())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn project_with_config(content: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(CONFIG_FILENAME), content).unwrap();
    temp
  }

  #[test]
  fn missing_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let config = ProjectConfig::load(temp.path()).unwrap();

    assert_eq!(config.sources, vec!["src".to_string(), "assets".to_string()]);
    assert!(config.output.ends_with("build"));
    assert_eq!(config.max_parallel_files, 128);
    assert!(config.manifest_path.ends_with("build/.bundler-manifest.json"));
    assert!(config.include_dependencies);
    assert!(config.rules.is_empty());
  }

  #[test]
  fn parses_kebab_case_keys() {
    let temp = project_with_config(
      r#"{
        "sources": ["./lib/"],
        "output": "dist",
        "max-parallel-files": 4,
        "rules": [{ "pattern": "**/*.css", "loaders": ["css"] }],
        "exclude": { "*": ["test/**"] },
        "report-file": "report.json"
      }"#,
    );
    let config = ProjectConfig::load(temp.path()).unwrap();

    assert_eq!(config.sources, vec!["lib".to_string()]);
    assert!(config.output.ends_with("dist"));
    assert_eq!(config.max_parallel_files, 4);
    assert_eq!(config.rules.len(), 1);
    assert!(config.report_file.unwrap().ends_with("report.json"));
  }

  #[test]
  fn malformed_file_is_an_error() {
    let temp = project_with_config("{ not json");
    let result = ProjectConfig::load(temp.path());
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let temp = project_with_config(r#"{ "outptu": "dist" }"#);
    let result = ProjectConfig::load(temp.path());
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn zero_parallelism_is_invalid() {
    let temp = project_with_config(r#"{ "max-parallel-files": 0 }"#);
    let result = ProjectConfig::load(temp.path());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn escaping_source_is_invalid() {
    let temp = project_with_config(r#"{ "sources": ["../elsewhere"] }"#);
    let result = ProjectConfig::load(temp.path());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn overrides_produce_new_value() {
    let temp = TempDir::new().unwrap();
    let config = ProjectConfig::load(temp.path()).unwrap();

    let overridden = config
      .with_overrides(ConfigOverrides {
        output: Some(PathBuf::from("out")),
        max_parallel_files: Some(2),
        ..Default::default()
      })
      .unwrap();

    assert!(config.output.ends_with("build"));
    assert!(overridden.output.ends_with("out"));
    assert!(overridden.manifest_path.ends_with("out/.bundler-manifest.json"));
    assert_eq!(overridden.max_parallel_files, 2);
  }

  #[test]
  fn fingerprint_tracks_rules() {
    let temp = TempDir::new().unwrap();
    let config = ProjectConfig::load(temp.path()).unwrap();
    let before = config.fingerprint().unwrap();

    let mut changed = config.clone();
    changed.rules = serde_json::from_str(r#"[{ "pattern": "**/*.json", "loaders": ["json"] }]"#).unwrap();

    assert_eq!(before, config.fingerprint().unwrap());
    assert_ne!(before, changed.fingerprint().unwrap());
  }

  #[test]
  fn excludes_merge_wildcard_and_named() {
    let temp = project_with_config(r#"{ "exclude": { "*": ["test/**"], "foo": ["*.md"] } }"#);
    let config = ProjectConfig::load(temp.path()).unwrap();

    assert_eq!(config.excludes_for("foo"), vec!["test/**", "*.md"]);
    assert_eq!(config.excludes_for("bar"), vec!["test/**"]);
  }
}
