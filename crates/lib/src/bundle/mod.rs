//! End-to-end bundling pipeline.
//!
//! A run goes through these steps:
//!
//! 1. Resolve the participating packages
//! 2. Collect each package's files and fingerprint them
//! 3. Partition packages into clean and dirty against the build manifest
//! 4. Drop the dirty packages from the manifest on disk
//! 5. Process every file of every dirty package with bounded concurrency
//! 6. On success, remove stale root output and commit the new manifest;
//!    always record diagnostics
//!
//! Nothing is committed when any file failed, so the next run reprocesses
//! every package that was dirty in this one.

mod files;
mod types;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::consts::NODE_MODULES;
use crate::loader::LoaderRegistry;
use crate::manifest::{BuildManifest, ManifestEntry, ManifestLoad, ManifestStore};
use crate::package::{PackageDescriptor, PackageGraphResolver, PackageId, ResolvedPackages};
use crate::project::ProjectConfig;
use crate::report::Report;
use crate::rules::RuleMatcher;
use crate::schedule::{PackageJob, Scheduler};
use crate::transform::TransformEngine;
use crate::util::hash::hash_files;

pub use files::collect_files;
pub use types::*;

/// The configured pipeline for one project.
#[derive(Debug, Clone)]
pub struct Bundler {
  config: Arc<ProjectConfig>,
  rules: Arc<RuleMatcher>,
  store: ManifestStore,
}

impl Bundler {
  /// Set up the pipeline; fails if a rule names an unknown loader or an
  /// invalid glob.
  pub fn new(config: ProjectConfig, registry: &LoaderRegistry) -> Result<Self, BundleError> {
    let rules = RuleMatcher::new(&config.rules, registry)?;
    let store = ManifestStore::new(config.manifest_path.clone());
    Ok(Self {
      config: Arc::new(config),
      rules: Arc::new(rules),
      store,
    })
  }

  pub fn config(&self) -> &ProjectConfig {
    &self.config
  }

  pub fn rules(&self) -> &RuleMatcher {
    &self.rules
  }

  /// Resolve the packages taking part in a build.
  pub fn resolve(&self) -> Result<ResolvedPackages, BundleError> {
    let resolver = PackageGraphResolver::for_project(&self.config.dir, self.config.include_dependencies)?;
    Ok(resolver.resolve()?)
  }

  /// Resolve, fingerprint and partition without processing anything.
  ///
  /// With `full` the manifest is not consulted and every package is dirty.
  pub fn plan(&self, full: bool) -> Result<BuildPlan, BundleError> {
    let resolved = self.resolve()?;
    let config_hash = self.config.fingerprint().map_err(BundleError::Fingerprint)?;

    let mut files = BTreeMap::new();
    let mut states = BTreeMap::new();
    for package in resolved.packages.values() {
      let package_files = collect_files(&self.config, package)?;
      let fingerprint = hash_files(&self.config.dir, &package_files).map_err(|source| BundleError::Hash {
        package: package.id.clone(),
        source,
      })?;
      states.insert(
        package.id.clone(),
        ManifestEntry {
          fingerprint,
          dependencies: resolved.graph.edges(&package.id),
        },
      );
      files.insert(package.id.clone(), package_files);
    }

    let manifest_load = if full {
      ManifestLoad::Discarded {
        reason: "full build requested".to_string(),
      }
    } else {
      self.store.load(&config_hash)
    };
    let previous = match &manifest_load {
      ManifestLoad::Loaded(manifest) => manifest.clone(),
      ManifestLoad::Absent | ManifestLoad::Discarded { .. } => BuildManifest::new(config_hash.clone()),
    };
    let partition = previous.partition(resolved.packages.values(), &states);

    Ok(BuildPlan {
      resolved,
      files,
      states,
      partition,
      manifest_load,
      previous,
      config_hash,
    })
  }

  /// Run the whole pipeline.
  ///
  /// Fails with [`BundleError::Transform`] carrying every file failure once
  /// all files finished. The manifest then only keeps the entries of packages
  /// this run did not touch.
  pub async fn run(&self, options: BundleOptions) -> Result<BundleOutcome, BundleError> {
    let started = Instant::now();
    let plan = self.plan(options.full)?;
    let incremental = plan.is_incremental();

    let mut report = Report::new();
    report.root = Some(plan.resolved.root.clone());
    report.dependencies = plan.resolved.dependencies().map(|p| p.id.clone()).collect();
    report.clean_packages = plan.partition.clean.iter().map(|p| p.id.clone()).collect();
    report.linked_dependencies = plan.resolved.linked.clone();
    report.incremental = incremental;
    report.rules_run(&self.config.rules);
    for warning in &plan.resolved.warnings {
      report.warn_unique(warning.to_string());
    }

    info!(
      packages = plan.resolved.len(),
      dirty = plan.partition.dirty.len(),
      clean = plan.partition.clean.len(),
      incremental,
      "starting build"
    );

    let processed: Vec<PackageId> = plan.partition.dirty.iter().map(|p| p.id.clone()).collect();
    let reused: Vec<PackageId> = plan.partition.clean.iter().map(|p| p.id.clone()).collect();
    if !processed.is_empty() {
      self.store.save(&plan.previous.retaining(&reused))?;
    }

    self.prune_stale_packages(&plan)?;
    let mut jobs = Vec::with_capacity(plan.partition.dirty.len());
    for package in &plan.partition.dirty {
      let dest = self.destination(package);
      if !package.is_root {
        clear_dir(&dest.dir)?;
      }
      jobs.push(PackageJob {
        src: package.clone(),
        dest,
        files: plan.files.get(&package.id).cloned().unwrap_or_default(),
      });
    }

    let engine = TransformEngine::new(self.config.clone(), self.rules.clone());
    let scheduler = Scheduler::new(Arc::new(engine), self.config.max_parallel_files);
    let result = scheduler.run(jobs).await;

    let written_paths: HashSet<PathBuf> =
      result.completed.iter().flat_map(|o| o.written.iter().cloned()).collect();
    let written = result.completed.iter().map(|o| o.written.len()).sum();
    let files = result.completed.len() + result.failed.len();
    for outcome in result.completed {
      for (file, entries) in outcome.logs {
        report.file_logs(file, entries);
      }
    }

    let mut errors = Vec::with_capacity(result.failed.len());
    for failure in result.failed {
      for (file, entries) in failure.logs {
        report.file_logs(file, entries);
      }
      report.error(failure.error.to_string());
      errors.push(failure.error);
    }
    report.execution_time(started.elapsed());

    if !errors.is_empty() {
      errors.sort_by(|a, b| a.file().cmp(b.file()));
      warn!(failed = errors.len(), "build failed, dirty packages left out of the manifest");
      if let Some(path) = &self.config.report_file {
        report.save(path)?;
      }
      return Err(BundleError::Transform {
        errors,
        report: Box::new(report),
      });
    }

    if plan.partition.dirty.iter().any(|p| p.is_root) {
      self.remove_unwritten(&written_paths)?;
    }
    let manifest = plan.previous.commit(&processed, &plan.states, plan.config_hash.clone());
    self.store.save(&manifest)?;

    if let Some(path) = &self.config.report_file {
      report.save(path)?;
    }

    info!(
      files,
      written,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "build complete"
    );

    Ok(BundleOutcome {
      report,
      processed,
      reused,
      files,
      written,
      incremental,
      report_file: self.config.report_file.clone(),
    })
  }

  /// Delete the output directory and the manifest.
  ///
  /// Returns whether anything was removed.
  pub fn clean(&self) -> Result<bool, BundleError> {
    let removed_output = clear_dir(&self.config.output)?;
    let removed_manifest = self.store.remove()?;
    info!(output = %self.config.output.display(), "cleaned");
    Ok(removed_output || removed_manifest)
  }

  /// Where `package`'s output goes.
  pub fn destination(&self, package: &PackageDescriptor) -> PackageDescriptor {
    if package.is_root {
      package.with_dir(self.config.output.clone())
    } else {
      package.with_dir(self.dependency_output_dir().join(package.target_dir_name()))
    }
  }

  fn dependency_output_dir(&self) -> PathBuf {
    self.config.output.join(NODE_MODULES)
  }

  /// Remove output of dependencies that no longer take part in the build.
  fn prune_stale_packages(&self, plan: &BuildPlan) -> Result<(), BundleError> {
    let dir = self.dependency_output_dir();
    let entries = match fs::read_dir(&dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(source) => return Err(BundleError::Clear { path: dir, source }),
    };

    let current: Vec<String> = plan.resolved.dependencies().map(|p| p.target_dir_name()).collect();
    for entry in entries.flatten() {
      let name = entry.file_name().to_string_lossy().into_owned();
      if current.contains(&name) || !entry.file_type().is_ok_and(|t| t.is_dir()) {
        continue;
      }
      debug!(dir = %name, "removing output of departed package");
      clear_dir(&entry.path())?;
    }
    Ok(())
  }

  /// Delete root output this run did not write, so a rebuilt root matches a
  /// from-scratch build. Dependency output and the manifest are left alone.
  fn remove_unwritten(&self, written: &HashSet<PathBuf>) -> Result<(), BundleError> {
    let output = &self.config.output;
    let keep = |path: &Path| {
      written.contains(path) || path == self.config.manifest_path || self.config.report_file.as_deref() == Some(path)
    };
    let walker = WalkDir::new(output)
      .contents_first(true)
      .into_iter()
      .filter_entry(|e| !(e.depth() == 1 && e.file_name() == NODE_MODULES));

    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) if e.io_error().is_some_and(|err| err.kind() == io::ErrorKind::NotFound) => continue,
        Err(e) => {
          return Err(BundleError::Clear {
            path: output.clone(),
            source: e.into(),
          });
        }
      };
      let path = entry.path();
      let removed = if entry.file_type().is_dir() {
        if entry.depth() == 0 || fs::read_dir(path).map(|mut d| d.next().is_some()).unwrap_or(true) {
          continue;
        }
        fs::remove_dir(path)
      } else if keep(path) {
        continue;
      } else {
        debug!(path = %path.display(), "removing stale output");
        fs::remove_file(path)
      };
      removed.map_err(|source| BundleError::Clear {
        path: path.to_path_buf(),
        source,
      })?;
    }
    Ok(())
  }
}

/// Remove a directory tree; a missing directory is fine.
fn clear_dir(path: &Path) -> Result<bool, BundleError> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(source) => Err(BundleError::Clear {
      path: path.to_path_buf(),
      source,
    }),
  }
}
