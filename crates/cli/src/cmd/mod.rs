mod build;
mod clean;
mod deps;
mod rules;
mod status;

use std::path::Path;

use anyhow::{Context, Result};

use bundler_lib::bundle::Bundler;
use bundler_lib::loader::LoaderRegistry;
use bundler_lib::project::{ConfigOverrides, ProjectConfig};

pub use build::{BuildArgs, cmd_build};
pub use clean::cmd_clean;
pub use deps::cmd_deps;
pub use rules::cmd_rules;
pub use status::cmd_status;

/// Load the project configuration and set up the pipeline with the built-in loaders.
fn load_bundler(project: &Path, overrides: ConfigOverrides) -> Result<Bundler> {
  let config = ProjectConfig::load(project)
    .with_context(|| format!("Failed to load project configuration from {}", project.display()))?;
  let config = config.with_overrides(overrides).context("Invalid command line override")?;
  let bundler = Bundler::new(config, &LoaderRegistry::with_builtins()).context("Invalid rule configuration")?;
  Ok(bundler)
}
