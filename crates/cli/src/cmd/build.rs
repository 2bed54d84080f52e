//! Implementation of the `bundler build` command.
//!
//! Runs the whole pipeline: resolves packages, reprocesses the ones whose
//! sources or dependencies changed and commits the build manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use bundler_lib::bundle::{BundleError, BundleOptions, BundleOutcome};
use bundler_lib::package::PackageId;
use bundler_lib::project::ConfigOverrides;
use bundler_lib::report::Report;

use super::load_bundler;
use crate::output::{
  OutputFormat, PackageStatus, format_elapsed, print_file_errors, print_info, print_json, print_package,
  print_report_pointer, print_stat, print_success,
};

/// Command line values of `bundler build`.
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
  pub output: Option<PathBuf>,
  pub max_parallel_files: Option<usize>,
  pub report_file: Option<PathBuf>,
  pub full: bool,
  pub verbose: bool,
}

#[derive(Serialize)]
struct BuildSummary<'a> {
  success: bool,
  processed: &'a [PackageId],
  reused: &'a [PackageId],
  files: usize,
  written: usize,
  incremental: bool,
  report: &'a Report,
}

/// Execute the build command.
///
/// Exits non-zero after printing every collected file error when any file
/// failed; warnings alone do not fail the build.
pub fn cmd_build(project: &Path, args: BuildArgs, format: OutputFormat) -> Result<()> {
  let overrides = ConfigOverrides {
    output: args.output,
    max_parallel_files: args.max_parallel_files,
    report_file: args.report_file,
    verbose: args.verbose.then_some(true),
  };
  let bundler = load_bundler(project, overrides)?;
  let report_file = bundler.config().report_file.clone();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(bundler.run(BundleOptions { full: args.full }));

  match result {
    Ok(outcome) => {
      print_outcome(&outcome, bundler.config().verbose, format)?;
      info!(output = %bundler.config().output.display(), "build finished");
      Ok(())
    }
    Err(BundleError::Transform { errors, report }) => {
      if format.is_json() {
        print_json(&BuildSummary {
          success: false,
          processed: &[],
          reused: &[],
          files: 0,
          written: 0,
          incremental: report.incremental,
          report: &report,
        })?;
      } else {
        print_file_errors(&errors);
        print_report_pointer(&report, report_file.as_deref());
      }
      bail!("Build failed: {} file(s) could not be processed", errors.len())
    }
    Err(e) => Err(e).context("Build failed"),
  }
}

fn print_outcome(outcome: &BundleOutcome, verbose: bool, format: OutputFormat) -> Result<()> {
  if format.is_json() {
    return print_json(&BuildSummary {
      success: true,
      processed: &outcome.processed,
      reused: &outcome.reused,
      files: outcome.files,
      written: outcome.written,
      incremental: outcome.incremental,
      report: &outcome.report,
    });
  }

  if outcome.incremental {
    print_info(&format!(
      "Incremental build: reusing output of {} unchanged package(s)",
      outcome.reused.len()
    ));
  }

  print_success("Build complete!");
  print_stat("Packages processed", outcome.processed.len());
  print_stat("Packages reused", outcome.reused.len());
  print_stat("Files processed", outcome.files);
  print_stat("Files written", outcome.written);
  if let Some(ms) = outcome.report.execution_time_ms {
    print_stat("Duration", format_elapsed(ms));
  }

  if verbose {
    for id in &outcome.processed {
      print_package(PackageStatus::Processed, id);
    }
    for id in &outcome.reused {
      print_package(PackageStatus::Reused, id);
    }
  }

  print_report_pointer(&outcome.report, outcome.report_file.as_deref());
  Ok(())
}
