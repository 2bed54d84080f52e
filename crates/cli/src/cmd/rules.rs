//! Implementation of the `bundler rules` command.
//!
//! Prints the loader chain each path resolves to, in execution order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use bundler_lib::project::ConfigOverrides;
use bundler_lib::util::path::{normalize, to_posix};

use super::load_bundler;
use crate::output::{OutputFormat, format_chain, print_json, print_warning, symbols};

pub fn cmd_rules(project: &Path, paths: &[PathBuf], format: OutputFormat) -> Result<()> {
  let bundler = load_bundler(project, ConfigOverrides::default())?;
  let project_dir = &bundler.config().dir;

  let mut results = Vec::with_capacity(paths.len());
  for path in paths {
    let file = project_relative(project_dir, path)
      .with_context(|| format!("{} is not inside the project {}", path.display(), project_dir.display()))?;
    let chain = bundler.rules().resolve(&file);
    results.push((file, chain));
  }

  if format.is_json() {
    let json: Vec<_> = results
      .iter()
      .map(|(file, chain)| {
        let loaders: Vec<_> = chain
          .iter()
          .map(|stage| {
            serde_json::json!({
              "loader": stage.id,
              "options": stage.options,
              "encoding": stage.encoding.map(|e| e.as_str()),
            })
          })
          .collect();
        serde_json::json!({ "file": file, "loaders": loaders })
      })
      .collect();
    return print_json(&json);
  }

  if bundler.rules().is_empty() {
    print_warning("No rules configured: every file is copied verbatim");
  }

  for (file, chain) in &results {
    println!("{} {} {}", file, symbols::ARROW, format_chain(chain));
  }

  Ok(())
}

/// Project-relative POSIX form of `path`.
///
/// Relative paths are taken relative to the project, not the working
/// directory, and need not exist.
fn project_relative(project_dir: &Path, path: &Path) -> Option<String> {
  if path.is_absolute() {
    let absolute = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    return absolute.strip_prefix(project_dir).ok().map(to_posix).filter(|p| !p.is_empty());
  }
  normalize(&to_posix(path)).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn relative_paths_are_normalized() {
    let dir = Path::new("/project");
    assert_eq!(project_relative(dir, Path::new("./src/a.css")), Some("src/a.css".to_string()));
    assert_eq!(project_relative(dir, Path::new("../elsewhere.css")), None);
  }

  #[test]
  fn absolute_paths_must_be_inside_project() {
    let dir = Path::new("/project");
    assert_eq!(project_relative(dir, Path::new("/project/src/a.css")), Some("src/a.css".to_string()));
    assert_eq!(project_relative(dir, Path::new("/other/a.css")), None);
  }
}
