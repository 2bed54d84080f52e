//! Incremental-build manifest.
//!
//! The manifest records, per package id, the source fingerprint and resolved
//! dependency edges of the last successful build. A package is clean when its
//! entry exists and both still match; clean packages are not reprocessed.
//!
//! The file is only ever replaced whole, through a temporary file and a
//! rename, after every file of the build was processed. A manifest that cannot
//! be read or trusted is discarded, which makes every package dirty.

mod types;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::package::{PackageDescriptor, PackageId};
use crate::util::hash::ContentHash;

pub use types::*;

impl BuildManifest {
  pub fn new(config_hash: ContentHash) -> Self {
    Self {
      version: MANIFEST_VERSION,
      config_hash,
      packages: BTreeMap::new(),
    }
  }

  /// Whether the recorded state of `id` equals `state`.
  pub fn is_clean(&self, id: &PackageId, state: &PackageState) -> bool {
    self.packages.get(id).is_some_and(|entry| entry == state)
  }

  /// Split `packages` into clean and dirty ones, setting their `clean` flag.
  ///
  /// Packages without a computed state are dirty.
  pub fn partition<'a>(
    &self,
    packages: impl IntoIterator<Item = &'a PackageDescriptor>,
    states: &BTreeMap<PackageId, PackageState>,
  ) -> Partition {
    let mut partition = Partition::default();

    for package in packages {
      let clean = states.get(&package.id).is_some_and(|state| self.is_clean(&package.id, state));
      if clean {
        partition.clean.push(package.with_clean(true));
      } else {
        partition.dirty.push(package.with_clean(false));
      }
    }

    debug!(
      clean = partition.clean.len(),
      dirty = partition.dirty.len(),
      "partitioned packages"
    );
    partition
  }

  /// The manifest after a successful build.
  ///
  /// Processed (`dirty`) packages get fresh entries from `states`; other
  /// packages keep their recorded entry; packages no longer in `states` are
  /// dropped.
  pub fn commit(
    &self,
    dirty: &[PackageId],
    states: &BTreeMap<PackageId, PackageState>,
    config_hash: ContentHash,
  ) -> BuildManifest {
    let packages = states
      .iter()
      .map(|(id, state)| {
        let entry = match self.packages.get(id) {
          Some(previous) if !dirty.contains(id) => previous.clone(),
          _ => state.clone(),
        };
        (id.clone(), entry)
      })
      .collect();

    BuildManifest {
      version: MANIFEST_VERSION,
      config_hash,
      packages,
    }
  }

  /// The manifest to keep on disk while a build is running: only the entries
  /// of `kept` packages, whose output the build does not touch.
  ///
  /// A build that stops halfway then leaves every other package dirty.
  pub fn retaining(&self, kept: &[PackageId]) -> BuildManifest {
    BuildManifest {
      version: MANIFEST_VERSION,
      config_hash: self.config_hash.clone(),
      packages: self
        .packages
        .iter()
        .filter(|(id, _)| kept.contains(id))
        .map(|(id, entry)| (id.clone(), entry.clone()))
        .collect(),
    }
  }
}

/// Reads and writes the manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
  path: PathBuf,
}

impl ManifestStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Load the manifest.
  ///
  /// Never fails: a manifest that cannot be used is reported as discarded.
  /// A manifest built with another configuration (`config_hash`) is discarded
  /// too.
  pub fn load(&self, config_hash: &ContentHash) -> ManifestLoad {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "no manifest, full build");
        return ManifestLoad::Absent;
      }
      Err(e) => return self.discard(format!("unreadable: {}", e)),
    };

    let manifest: BuildManifest = match serde_json::from_str(&content) {
      Ok(manifest) => manifest,
      Err(e) => return self.discard(format!("corrupt: {}", e)),
    };

    if manifest.version != MANIFEST_VERSION {
      return self.discard(format!("unsupported version {}", manifest.version));
    }

    if &manifest.config_hash != config_hash {
      info!("configuration changed since last build, full build");
      return ManifestLoad::Discarded {
        reason: "configuration changed".to_string(),
      };
    }

    debug!(path = %self.path.display(), packages = manifest.packages.len(), "manifest loaded");
    ManifestLoad::Loaded(manifest)
  }

  fn discard(&self, reason: String) -> ManifestLoad {
    warn!(path = %self.path.display(), reason = %reason, "ignoring build manifest, full build");
    ManifestLoad::Discarded { reason }
  }

  /// Replace the manifest file atomically.
  pub fn save(&self, manifest: &BuildManifest) -> Result<(), ManifestError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(|source| ManifestError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let content = serde_json::to_string_pretty(manifest)?;
    let temp_path = self.temp_path();
    fs::write(&temp_path, &content).map_err(|source| ManifestError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, &self.path).map_err(|source| ManifestError::Write {
      path: self.path.clone(),
      source,
    })?;

    debug!(path = %self.path.display(), packages = manifest.packages.len(), "manifest saved");
    Ok(())
  }

  /// Delete the manifest file. Returns whether one existed.
  pub fn remove(&self) -> Result<bool, ManifestError> {
    match fs::remove_file(&self.path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(source) => Err(ManifestError::Remove {
        path: self.path.clone(),
        source,
      }),
    }
  }

  fn temp_path(&self) -> PathBuf {
    let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    self.path.with_file_name(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn hash(s: &str) -> ContentHash {
    ContentHash(s.to_string())
  }

  fn state(fingerprint: &str, deps: &[(&str, &str)]) -> PackageState {
    PackageState {
      fingerprint: hash(fingerprint),
      dependencies: deps
        .iter()
        .map(|(name, id)| (name.to_string(), PackageId(id.to_string())))
        .collect(),
    }
  }

  fn package(name: &str) -> PackageDescriptor {
    PackageDescriptor::new(name, "1.0.0", format!("node_modules/{}", name), false)
  }

  #[test]
  fn partition_requires_entry_edges_and_fingerprint() {
    let (a, b, c, d) = (package("a"), package("b"), package("c"), package("d"));

    let mut manifest = BuildManifest::new(hash("cfg"));
    manifest.packages.insert(a.id.clone(), state("fa", &[("x", "x@1.0.0")]));
    manifest.packages.insert(b.id.clone(), state("fb", &[]));
    manifest.packages.insert(c.id.clone(), state("fc", &[]));

    let states = BTreeMap::from([
      (a.id.clone(), state("fa", &[("x", "x@1.0.0")])),
      (b.id.clone(), state("fb", &[("x", "x@1.0.0")])),
      (c.id.clone(), state("fc-changed", &[])),
      (d.id.clone(), state("fd", &[])),
    ]);

    let partition = manifest.partition([&a, &b, &c, &d], &states);

    let clean: Vec<&str> = partition.clean.iter().map(|p| p.name.as_str()).collect();
    let dirty: Vec<&str> = partition.dirty.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(clean, vec!["a"]);
    assert_eq!(dirty, vec!["b", "c", "d"]);
    assert!(partition.clean[0].clean);
    assert!(!partition.dirty[0].clean);
  }

  #[test]
  fn commit_refreshes_dirty_and_keeps_clean() {
    let (a, b, gone) = (package("a"), package("b"), package("gone"));

    let mut previous = BuildManifest::new(hash("cfg"));
    previous.packages.insert(a.id.clone(), state("fa", &[]));
    previous.packages.insert(b.id.clone(), state("fb-old", &[]));
    previous.packages.insert(gone.id.clone(), state("fg", &[]));

    let states = BTreeMap::from([(a.id.clone(), state("fa", &[])), (b.id.clone(), state("fb-new", &[]))]);

    let next = previous.commit(&[b.id.clone()], &states, hash("cfg"));

    assert_eq!(next.packages.len(), 2);
    assert_eq!(next.packages[&a.id].fingerprint, hash("fa"));
    assert_eq!(next.packages[&b.id].fingerprint, hash("fb-new"));
  }

  #[test]
  fn retaining_drops_every_other_entry() {
    let (a, b, gone) = (package("a"), package("b"), package("gone"));

    let mut manifest = BuildManifest::new(hash("cfg"));
    manifest.packages.insert(a.id.clone(), state("fa", &[]));
    manifest.packages.insert(b.id.clone(), state("fb", &[]));
    manifest.packages.insert(gone.id.clone(), state("fg", &[]));

    let pending = manifest.retaining(&[a.id.clone()]);

    assert_eq!(pending.config_hash, hash("cfg"));
    assert_eq!(pending.packages.keys().collect::<Vec<_>>(), vec![&a.id]);
  }

  #[test]
  fn store_round_trip_and_remove() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("build/.bundler-manifest.json"));

    assert_eq!(store.load(&hash("cfg")), ManifestLoad::Absent);

    let mut manifest = BuildManifest::new(hash("cfg"));
    manifest.packages.insert(PackageId::new("a", "1.0.0"), state("fa", &[]));
    store.save(&manifest).unwrap();

    assert_eq!(store.load(&hash("cfg")), ManifestLoad::Loaded(manifest));
    assert!(!store.temp_path().exists());

    assert!(store.remove().unwrap());
    assert!(!store.remove().unwrap());
  }

  #[test]
  fn corrupt_manifest_is_discarded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest.json");
    fs::write(&path, "{ truncated").unwrap();

    let load = ManifestStore::new(&path).load(&hash("cfg"));
    assert!(matches!(load, ManifestLoad::Discarded { .. }));
  }

  #[test]
  fn other_version_or_config_is_discarded() {
    let temp = TempDir::new().unwrap();
    let store = ManifestStore::new(temp.path().join("manifest.json"));

    let mut manifest = BuildManifest::new(hash("cfg"));
    store.save(&manifest).unwrap();
    assert!(matches!(store.load(&hash("other")), ManifestLoad::Discarded { .. }));

    manifest.version = MANIFEST_VERSION + 1;
    store.save(&manifest).unwrap();
    assert!(matches!(store.load(&hash("cfg")), ManifestLoad::Discarded { .. }));
  }
}
