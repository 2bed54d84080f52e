use std::path::Path;

use anyhow::{Context, Result};

use bundler_lib::project::ConfigOverrides;

use super::load_bundler;
use crate::output::{OutputFormat, print_info, print_json, print_success};

pub fn cmd_clean(project: &Path, format: OutputFormat) -> Result<()> {
  let bundler = load_bundler(project, ConfigOverrides::default())?;
  let removed = bundler.clean().context("Failed to clean build output")?;
  let output = bundler.config().output.display().to_string();

  if format.is_json() {
    return print_json(&serde_json::json!({ "removed": removed, "output": output }));
  }

  if removed {
    print_success(&format!("Removed {}", output));
  } else {
    print_info("Nothing to clean");
  }
  Ok(())
}
