//! Implementation of the `bundler deps` command.

use std::path::Path;

use anyhow::{Context, Result};

use bundler_lib::project::ConfigOverrides;

use super::load_bundler;
use crate::output::{self, OutputFormat, print_json, print_stat, print_success, print_warning};

pub fn cmd_deps(project: &Path, verbose: bool, format: OutputFormat) -> Result<()> {
  let bundler = load_bundler(project, ConfigOverrides::default())?;
  let resolved = bundler.resolve().context("Failed to resolve packages")?;

  if format.is_json() {
    let packages: Vec<_> = resolved
      .packages
      .values()
      .map(|p| {
        serde_json::json!({
          "id": p.id,
          "dir": p.posix_dir(),
          "root": p.is_root,
          "dependencies": resolved.graph.edges(&p.id),
        })
      })
      .collect();
    let warnings: Vec<String> = resolved.warnings.iter().map(|w| w.to_string()).collect();
    return print_json(&serde_json::json!({
      "root": resolved.root,
      "packages": packages,
      "linked": resolved.linked,
      "warnings": warnings,
    }));
  }

  print_success(&format!("{} package(s)", resolved.len()));
  for package in resolved.packages.values() {
    let dir = if package.is_root { ".".to_string() } else { package.posix_dir() };
    let marker = if package.is_root { " (root)" } else { "" };
    println!("  {} {}{} {} {}", output::symbols::INFO, package.id, marker, output::symbols::ARROW, dir);

    if verbose {
      for (name, dependency) in resolved.graph.edges(&package.id) {
        println!("      {} {}", name, dependency);
      }
    }
  }

  if !resolved.linked.is_empty() {
    println!();
    print_stat("Linked dependencies", resolved.linked.len());
    for link in &resolved.linked {
      println!(
        "  {} {}@{} {} {}",
        link.requester,
        link.name,
        link.range,
        output::symbols::ARROW,
        link.resolved
      );
    }
  }

  for warning in &resolved.warnings {
    print_warning(&warning.to_string());
  }

  Ok(())
}
