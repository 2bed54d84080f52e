//! Status command implementation.
//!
//! Resolves the project, fingerprints every package and shows which ones the
//! next build would reprocess.

use std::path::Path;

use anyhow::{Context, Result};

use bundler_lib::manifest::ManifestLoad;
use bundler_lib::project::ConfigOverrides;

use super::load_bundler;
use crate::output::{
  OutputFormat, PackageStatus, print_info, print_json, print_package, print_stat, print_success, print_warning,
};

pub fn cmd_status(project: &Path, verbose: bool, format: OutputFormat) -> Result<()> {
  let bundler = load_bundler(project, ConfigOverrides::default())?;
  let plan = bundler.plan(false).context("Failed to plan build")?;

  let manifest = match &plan.manifest_load {
    ManifestLoad::Absent => "absent".to_string(),
    ManifestLoad::Loaded(_) => "loaded".to_string(),
    ManifestLoad::Discarded { reason } => format!("discarded ({})", reason),
  };

  if format.is_json() {
    let ids = |packages: &[bundler_lib::package::PackageDescriptor]| -> Vec<String> {
      packages.iter().map(|p| p.id.to_string()).collect()
    };
    return print_json(&serde_json::json!({
      "manifest": manifest,
      "clean": ids(&plan.partition.clean),
      "dirty": ids(&plan.partition.dirty),
      "files": plan.dirty_file_count(),
    }));
  }

  print_stat("Manifest", &manifest);
  print_stat("Packages", plan.resolved.len());
  print_stat("Up to date", plan.partition.clean.len());
  print_stat("To rebuild", plan.partition.dirty.len());
  print_stat("Files to process", plan.dirty_file_count());

  if plan.partition.dirty.is_empty() {
    println!();
    print_success("Everything is up to date");
    return Ok(());
  }

  println!();
  for package in &plan.partition.dirty {
    print_package(PackageStatus::Dirty, &package.id);
  }
  if verbose {
    for package in &plan.partition.clean {
      print_package(PackageStatus::Clean, &package.id);
    }
  }

  if !plan.resolved.warnings.is_empty() {
    println!();
    for warning in &plan.resolved.warnings {
      print_warning(&warning.to_string());
    }
  }

  println!();
  print_info("Run 'bundler build' to rebuild");
  Ok(())
}
