//! File sets of participating packages.

use std::collections::BTreeSet;
use std::path::Path;

use glob::Pattern;
use tracing::{debug, trace};
use walkdir::WalkDir;

use super::BundleError;
use crate::consts::{NODE_MODULES, PACKAGE_JSON};
use crate::package::PackageDescriptor;
use crate::project::ProjectConfig;
use crate::rules::{MATCH_OPTIONS, RuleError};
use crate::util::path::{join, strip_dir, to_posix};

/// Project-relative POSIX paths of every file `package` contributes, sorted.
///
/// The root package contributes its configured sources and its
/// `package.json`; a dependency contributes everything below its directory
/// except nested `node_modules`. The output directory, the manifest and the
/// package's exclusion globs are skipped.
pub fn collect_files(config: &ProjectConfig, package: &PackageDescriptor) -> Result<Vec<String>, BundleError> {
  let excludes = config
    .excludes_for(&package.name)
    .into_iter()
    .map(|pattern| {
      Pattern::new(pattern).map_err(|source| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  let package_dir = package.posix_dir();
  let mut files = BTreeSet::new();

  if package.is_root {
    for source in &config.sources {
      walk(config, package, &join(&package_dir, source), &mut files)?;
    }
    let manifest = join(&package_dir, PACKAGE_JSON);
    if config.dir.join(&manifest).is_file() {
      files.insert(manifest);
    }
  } else {
    walk(config, package, &package_dir, &mut files)?;
  }

  files.retain(|file| {
    let rel = strip_dir(file, &package_dir).unwrap_or(file);
    let excluded = excludes.iter().any(|p| p.matches_with(rel, MATCH_OPTIONS));
    if excluded {
      trace!(file = %file, "excluded");
    }
    !excluded
  });

  debug!(package = %package.id, count = files.len(), "collected files");
  Ok(files.into_iter().collect())
}

/// Add every file at or below the project-relative `start` to `files`.
fn walk(
  config: &ProjectConfig,
  package: &PackageDescriptor,
  start: &str,
  files: &mut BTreeSet<String>,
) -> Result<(), BundleError> {
  let root = config.dir.join(start);
  if !root.exists() {
    debug!(package = %package.id, path = %start, "source does not exist, skipping");
    return Ok(());
  }

  let nested_modules = !package.is_root;
  let walker = WalkDir::new(&root)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| {
      let path = entry.path();
      if is_output(config, path) {
        return false;
      }
      !(nested_modules && entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == NODE_MODULES)
    });

  for entry in walker {
    let entry = entry.map_err(|source| BundleError::Scan {
      package: package.id.clone(),
      path: root.clone(),
      source,
    })?;
    if !entry.file_type().is_file() {
      continue;
    }
    if let Ok(rel) = entry.path().strip_prefix(&config.dir) {
      files.insert(to_posix(rel));
    }
  }
  Ok(())
}

fn is_output(config: &ProjectConfig, path: &Path) -> bool {
  path.starts_with(&config.output) || path == config.manifest_path
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use tempfile::TempDir;

  use super::*;
  use crate::project::ProjectFile;
  use crate::util::testutil::{write_file, write_package};

  fn config(temp: &TempDir, file: ProjectFile) -> ProjectConfig {
    ProjectConfig::from_file(temp.path().to_path_buf(), file).unwrap()
  }

  #[test]
  fn root_collects_sources_and_package_json() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "", "app", "1.0.0", &[]);
    write_file(temp.path(), "src/b.js", "");
    write_file(temp.path(), "src/nested/a.js", "");
    write_file(temp.path(), "assets/logo.svg", "");
    write_file(temp.path(), "README.md", "");
    write_file(temp.path(), "build/stale.js", "");

    let config = config(&temp, ProjectFile::default());
    let root = PackageDescriptor::new("app", "1.0.0", PathBuf::new(), true);

    assert_eq!(
      collect_files(&config, &root).unwrap(),
      vec!["assets/logo.svg", "package.json", "src/b.js", "src/nested/a.js"]
    );
  }

  #[test]
  fn single_file_source_is_collected() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "index.js", "");
    write_file(temp.path(), "other.js", "");

    let config = config(
      &temp,
      ProjectFile {
        sources: vec!["index.js".to_string()],
        ..Default::default()
      },
    );
    let root = PackageDescriptor::new("app", "1.0.0", PathBuf::new(), true);

    assert_eq!(collect_files(&config, &root).unwrap(), vec!["index.js"]);
  }

  #[test]
  fn dependency_skips_nested_node_modules() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "node_modules/foo", "foo", "1.0.0", &[]);
    write_file(temp.path(), "node_modules/foo/lib/index.js", "");
    write_package(temp.path(), "node_modules/foo/node_modules/bar", "bar", "1.0.0", &[]);

    let config = config(&temp, ProjectFile::default());
    let foo = PackageDescriptor::new("foo", "1.0.0", "node_modules/foo", false);

    assert_eq!(
      collect_files(&config, &foo).unwrap(),
      vec!["node_modules/foo/lib/index.js", "node_modules/foo/package.json"]
    );
  }

  #[test]
  fn excludes_are_package_relative() {
    let temp = TempDir::new().unwrap();
    write_package(temp.path(), "node_modules/foo", "foo", "1.0.0", &[]);
    write_file(temp.path(), "node_modules/foo/README.md", "");
    write_file(temp.path(), "node_modules/foo/test/a.js", "");
    write_file(temp.path(), "node_modules/foo/index.js", "");

    let mut file = ProjectFile::default();
    file.exclude.insert("*".to_string(), vec!["test/**".to_string()]);
    file.exclude.insert("foo".to_string(), vec!["*.md".to_string()]);
    let config = config(&temp, file);
    let foo = PackageDescriptor::new("foo", "1.0.0", "node_modules/foo", false);

    assert_eq!(
      collect_files(&config, &foo).unwrap(),
      vec!["node_modules/foo/index.js", "node_modules/foo/package.json"]
    );
  }

  #[test]
  fn invalid_exclude_glob_is_an_error() {
    let temp = TempDir::new().unwrap();
    let mut file = ProjectFile::default();
    file.exclude.insert("*".to_string(), vec!["[".to_string()]);
    let config = config(&temp, file);
    let root = PackageDescriptor::new("app", "1.0.0", PathBuf::new(), true);

    assert!(matches!(
      collect_files(&config, &root),
      Err(BundleError::Rules(RuleError::InvalidPattern { .. }))
    ));
  }
}
