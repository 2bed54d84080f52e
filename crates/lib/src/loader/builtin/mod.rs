//! Built-in loaders.
//!
//! | id            | encoding | effect                                                |
//! |---------------|----------|-------------------------------------------------------|
//! | `css`         | utf-8    | emits `<file>.js` injecting a `<link>` to the sheet   |
//! | `json`        | utf-8    | emits `<file>.js` exporting the parsed JSON           |
//! | `remove-hash` | binary   | diverts `name.<hex8+>.ext` to `name.ext`              |
//! | `sfc`         | utf-8    | splits a component into script and style virtual files |

pub mod css;
pub mod json;
pub mod remove_hash;
pub mod sfc;

use serde::de::DeserializeOwned;

use super::LoaderError;

/// Deserialize a loader's options, treating `null` as "all defaults".
pub(crate) fn parse_options<T>(loader_id: &str, file_path: &str, options: &serde_json::Value) -> Result<T, LoaderError>
where
  T: DeserializeOwned + Default,
{
  if options.is_null() {
    return Ok(T::default());
  }
  serde_json::from_value(options.clone()).map_err(|e| {
    LoaderError::new(
      format!("reading options of '{}' for {}", loader_id, file_path),
      e.to_string(),
    )
  })
}

/// Error for a text loader that received no content.
pub(crate) fn missing_content(loader_id: &str, file_path: &str) -> LoaderError {
  LoaderError::new(
    format!("processing {}", file_path),
    format!("'{}' needs file content but an earlier loader removed it", loader_id),
  )
}
