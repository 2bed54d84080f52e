//! Mapping from stable loader identifiers to loader implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use super::Loader;
use super::builtin;

/// Loader implementations keyed by identifier.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
  loaders: BTreeMap<String, Arc<dyn Loader>>,
}

impl LoaderRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding every built-in loader.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.register(builtin::css::ID, Arc::new(builtin::css::CssLoader));
    registry.register(builtin::json::ID, Arc::new(builtin::json::JsonLoader));
    registry.register(builtin::remove_hash::ID, Arc::new(builtin::remove_hash::RemoveHashLoader));
    registry.register(builtin::sfc::ID, Arc::new(builtin::sfc::SfcLoader));
    registry
  }

  /// Register (or replace) a loader under `id`.
  pub fn register(&mut self, id: impl Into<String>, loader: Arc<dyn Loader>) {
    let id = id.into();
    trace!(loader = %id, "registering loader");
    self.loaders.insert(id, loader);
  }

  pub fn get(&self, id: &str) -> Option<Arc<dyn Loader>> {
    self.loaders.get(id).cloned()
  }

  /// Registered identifiers, sorted.
  pub fn ids(&self) -> Vec<&str> {
    self.loaders.keys().map(|s| s.as_str()).collect()
  }
}

impl std::fmt::Debug for LoaderRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LoaderRegistry").field("loaders", &self.ids()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtins_are_registered() {
    let registry = LoaderRegistry::with_builtins();
    assert_eq!(registry.ids(), vec!["css", "json", "remove-hash", "sfc"]);
    assert!(registry.get("css").is_some());
    assert!(registry.get("babel").is_none());
  }

  #[test]
  fn register_replaces_existing() {
    let mut registry = LoaderRegistry::with_builtins();
    registry.register("css", Arc::new(builtin::json::JsonLoader));
    assert_eq!(registry.ids().len(), 4);
  }
}
