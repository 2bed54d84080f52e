//! Package graph resolution.
//!
//! Starting from the root `package.json`, every declared dependency is matched
//! against the packages installed under `node_modules` and followed
//! transitively. Candidate selection mirrors how a module loader finds a
//! package on disk:
//!
//! 1. the copy nested under the requester (`<requester>/node_modules/<name>`),
//!    then the copies in each enclosing `node_modules`, ending with the
//!    hoisted top-level copy;
//! 2. failing that, the highest satisfying version installed anywhere else.
//!
//! Peer dependencies are resolved per consumer against every installed
//! candidate. Exactly one match adds the edge; zero or several matches are
//! reported as warnings and the edge is dropped.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::range::VersionRange;
use super::{
  EdgeKind, LinkedDependency, PackageDescriptor, PackageGraph, PackageId, PackageJson, ResolutionError,
  ResolutionWarning,
};
use crate::consts::{NODE_MODULES, PACKAGE_JSON};
use crate::util::path::{join, to_posix};

/// A package found on disk.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
  /// Project-relative POSIX directory.
  pub dir: String,
  pub manifest: PackageJson,
  /// Parsed version; `None` if `package.json` holds an invalid one.
  pub version: Option<Version>,
}

impl InstalledPackage {
  pub fn new(dir: impl Into<String>, manifest: PackageJson) -> Self {
    let version = Version::parse(&manifest.version).ok();
    Self {
      dir: dir.into(),
      manifest,
      version,
    }
  }

  pub fn id(&self) -> PackageId {
    PackageId::new(&self.manifest.name, &self.manifest.version)
  }

  fn satisfies(&self, range: &VersionRange) -> bool {
    match (range, &self.version) {
      (VersionRange::Any, _) => true,
      (_, Some(version)) => range.matches(version),
      (_, None) => false,
    }
  }

  fn descriptor(&self) -> PackageDescriptor {
    PackageDescriptor::new(&self.manifest.name, &self.manifest.version, &self.dir, false)
  }
}

/// Installed candidates, grouped by package name.
#[derive(Debug, Clone, Default)]
pub struct InstalledPackages {
  by_name: BTreeMap<String, Vec<InstalledPackage>>,
}

impl InstalledPackages {
  /// Find every package under `<project_dir>/node_modules`.
  ///
  /// A `package.json` counts when its directory sits directly in a
  /// `node_modules` directory or in an `@scope` directory inside one. Entries
  /// that cannot be read are logged and skipped.
  pub fn scan(project_dir: &Path) -> Result<Self, ResolutionError> {
    let root = project_dir.join(NODE_MODULES);
    let mut candidates = Vec::new();

    if !root.is_dir() {
      debug!(path = %root.display(), "no node_modules directory");
      return Ok(Self::default());
    }

    for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          warn!(error = %e, "skipping unreadable entry in node_modules");
          continue;
        }
      };
      if entry.file_name() != PACKAGE_JSON || !entry.file_type().is_file() {
        continue;
      }
      let Some(dir) = entry.path().parent() else {
        continue;
      };
      if !is_package_dir(dir) {
        continue;
      }

      match PackageJson::read(entry.path()) {
        Ok(manifest) if !manifest.name.is_empty() => {
          let rel = dir.strip_prefix(project_dir).map_err(|_| ResolutionError::Scan {
            path: dir.to_path_buf(),
            message: "package directory is outside the project".to_string(),
          })?;
          candidates.push(InstalledPackage::new(to_posix(rel), manifest));
        }
        Ok(_) => warn!(path = %entry.path().display(), "package.json has no name, skipping"),
        Err(e) => warn!(error = %e, "skipping invalid package"),
      }
    }

    debug!(count = candidates.len(), "scanned installed packages");
    Ok(Self::from_candidates(candidates))
  }

  pub fn from_candidates(candidates: impl IntoIterator<Item = InstalledPackage>) -> Self {
    let mut by_name: BTreeMap<String, Vec<InstalledPackage>> = BTreeMap::new();
    for candidate in candidates {
      by_name.entry(candidate.manifest.name.clone()).or_default().push(candidate);
    }
    Self { by_name }
  }

  /// Every installed copy of `name`.
  pub fn candidates(&self, name: &str) -> &[InstalledPackage] {
    self.by_name.get(name).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.by_name.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.by_name.is_empty()
  }
}

fn is_package_dir(dir: &Path) -> bool {
  let Some(parent) = dir.parent() else {
    return false;
  };
  let is_node_modules = |p: &Path| p.file_name().is_some_and(|n| n == NODE_MODULES);

  if is_node_modules(parent) {
    return true;
  }
  parent.file_name().is_some_and(|n| n.to_string_lossy().starts_with('@'))
    && parent.parent().is_some_and(is_node_modules)
}

/// Output of a resolution.
#[derive(Debug)]
pub struct ResolvedPackages {
  pub root: PackageId,
  /// Every participating package, root included.
  pub packages: BTreeMap<PackageId, PackageDescriptor>,
  pub graph: PackageGraph,
  pub warnings: Vec<ResolutionWarning>,
  pub linked: BTreeSet<LinkedDependency>,
}

impl ResolvedPackages {
  pub fn root_package(&self) -> Option<&PackageDescriptor> {
    self.packages.get(&self.root)
  }

  /// Non-root packages, sorted by id.
  pub fn dependencies(&self) -> impl Iterator<Item = &PackageDescriptor> {
    self.packages.values().filter(|p| !p.is_root)
  }

  pub fn len(&self) -> usize {
    self.packages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }
}

/// Walks declared dependencies from the root package.
#[derive(Debug)]
pub struct PackageGraphResolver {
  root: PackageJson,
  installed: InstalledPackages,
  include_dependencies: bool,
}

struct Pending {
  id: PackageId,
  dir: String,
  manifest: PackageJson,
}

impl PackageGraphResolver {
  /// Resolver for the project at `project_dir`, scanning its `node_modules`.
  pub fn for_project(project_dir: &Path, include_dependencies: bool) -> Result<Self, ResolutionError> {
    let root = PackageJson::read(&project_dir.join(PACKAGE_JSON))?;
    let installed = if include_dependencies {
      InstalledPackages::scan(project_dir)?
    } else {
      InstalledPackages::default()
    };
    Ok(Self::new(root, installed, include_dependencies))
  }

  pub fn new(root: PackageJson, installed: InstalledPackages, include_dependencies: bool) -> Self {
    Self {
      root,
      installed,
      include_dependencies,
    }
  }

  pub fn resolve(&self) -> Result<ResolvedPackages, ResolutionError> {
    let root = PackageDescriptor::new(&self.root.name, &self.root.version, PathBuf::new(), true);
    let root_id = root.id.clone();

    let mut packages = BTreeMap::new();
    let mut graph = PackageGraph::new();
    let mut warnings = Vec::new();
    let mut linked = BTreeSet::new();

    graph.add_package(&root_id);
    packages.insert(root_id.clone(), root);

    if !self.include_dependencies {
      info!(root = %root_id, "dependencies excluded from build");
      return Ok(ResolvedPackages {
        root: root_id,
        packages,
        graph,
        warnings,
        linked,
      });
    }

    let mut queue = VecDeque::from([Pending {
      id: root_id.clone(),
      dir: String::new(),
      manifest: self.root.clone(),
    }]);

    while let Some(pending) = queue.pop_front() {
      let mut discovered = Vec::new();

      for (name, range) in &pending.manifest.dependencies {
        let parsed = VersionRange::parse(range);
        let selected = self.select(&pending, name, range, &parsed)?;
        let id = selected.id();

        if parsed.is_linked() {
          linked.insert(LinkedDependency {
            requester: pending.id.clone(),
            name: name.clone(),
            range: range.clone(),
            resolved: id.clone(),
          });
        }

        graph.add_edge(&pending.id, &id, name, EdgeKind::Regular);
        discovered.push(selected);
      }

      for (name, range) in &pending.manifest.peer_dependencies {
        match self.select_peer(&pending.id, name, range) {
          Ok(selected) => {
            graph.add_edge(&pending.id, &selected.id(), name, EdgeKind::Peer);
            discovered.push(selected);
          }
          Err(warning) => {
            warn!(
              consumer = %warning.consumer,
              peer = %warning.peer,
              range = %warning.range,
              matches = warning.matches.len(),
              "{}",
              warning
            );
            warnings.push(warning);
          }
        }
      }

      for selected in discovered {
        let id = selected.id();
        if packages.contains_key(&id) {
          continue;
        }
        debug!(package = %id, dir = %selected.dir, requester = %pending.id, "resolved package");
        packages.insert(id.clone(), selected.descriptor());
        queue.push_back(Pending {
          id,
          dir: selected.dir.clone(),
          manifest: selected.manifest.clone(),
        });
      }
    }

    info!(root = %root_id, count = packages.len(), warnings = warnings.len(), "resolved packages");

    Ok(ResolvedPackages {
      root: root_id,
      packages,
      graph,
      warnings,
      linked,
    })
  }

  /// Pick the installed copy of `name` a regular dependency resolves to.
  fn select(
    &self,
    requester: &Pending,
    name: &str,
    range: &str,
    parsed: &VersionRange,
  ) -> Result<&InstalledPackage, ResolutionError> {
    let candidates = self.installed.candidates(name);
    let placed = |dir: &str| candidates.iter().find(|c| c.dir == dir);

    for dir in lookup_dirs(&requester.dir, name) {
      if let Some(candidate) = placed(&dir)
        && (parsed.is_linked() || candidate.satisfies(parsed))
      {
        return Ok(candidate);
      }
    }

    if !parsed.is_linked()
      && let Some(best) = candidates
        .iter()
        .filter(|c| c.satisfies(parsed))
        .max_by(|a, b| a.version.cmp(&b.version).then_with(|| b.dir.cmp(&a.dir)))
    {
      return Ok(best);
    }

    Err(ResolutionError::Unsatisfied {
      requester: requester.id.clone(),
      dependency: name.to_string(),
      range: range.to_string(),
      candidates: candidates.iter().map(|c| c.manifest.version.clone()).collect(),
    })
  }

  /// Find the single installed candidate for a peer dependency.
  fn select_peer(&self, consumer: &PackageId, name: &str, range: &str) -> Result<&InstalledPackage, ResolutionWarning> {
    let parsed = VersionRange::parse(range);

    let mut unique: BTreeMap<PackageId, &InstalledPackage> = BTreeMap::new();
    for candidate in self.installed.candidates(name) {
      unique.entry(candidate.id()).or_insert(candidate);
    }

    let matches: Vec<(&PackageId, &&InstalledPackage)> =
      unique.iter().filter(|(_, c)| c.satisfies(&parsed)).collect();

    match matches.as_slice() {
      [(_, only)] => Ok(only),
      _ => Err(ResolutionWarning {
        consumer: consumer.clone(),
        peer: name.to_string(),
        range: range.to_string(),
        matches: matches.iter().map(|(id, _)| (*id).clone()).collect(),
        candidates: unique.len(),
      }),
    }
  }
}

/// Directories a dependency `name` of a package in `requester_dir` may occupy,
/// most specific first.
fn lookup_dirs(requester_dir: &str, name: &str) -> Vec<String> {
  let target = join(NODE_MODULES, name);
  let mut dirs = vec![join(requester_dir, &target)];

  let segments: Vec<&str> = requester_dir.split('/').filter(|s| !s.is_empty()).collect();
  for (i, segment) in segments.iter().enumerate().rev() {
    if *segment == NODE_MODULES {
      let dir = join(&segments[..i].join("/"), &target);
      if !dirs.contains(&dir) {
        dirs.push(dir);
      }
    }
  }

  dirs
}
