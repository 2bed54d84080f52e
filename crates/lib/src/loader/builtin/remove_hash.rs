//! Removes bundler content hashes from file names.
//!
//! A hash is the rightmost component of at least [`MIN_HASH_LEN`] hex digits
//! that is neither the first nor the last dot-separated part of the file name:
//! `main.3f2a9c1d.js` becomes `main.js`, while `jquery-3.4.1.min.js` is left
//! alone. Content is passed through untouched as raw bytes.

use async_trait::async_trait;

use crate::loader::{Loader, LoaderContext, LoaderError, LoaderMetadata, LoaderOutput};

pub const ID: &str = "remove-hash";

/// Shortest component accepted as a hash.
pub const MIN_HASH_LEN: usize = 8;

pub struct RemoveHashLoader;

#[async_trait]
impl Loader for RemoveHashLoader {
  fn metadata(&self) -> LoaderMetadata {
    LoaderMetadata::binary()
  }

  async fn exec(&self, ctx: &LoaderContext<'_>, _options: &serde_json::Value) -> Result<LoaderOutput, LoaderError> {
    let Some(new_path) = remove_hash(ctx.file_path) else {
      ctx.log.info(ID, "No hash in file name; nothing to be done");
      return Ok(LoaderOutput::unchanged());
    };

    let Some(content) = ctx.content else {
      return Ok(LoaderOutput::unchanged());
    };

    ctx.log.info(ID, format!("Diverting file output to {}", new_path));
    Ok(
      LoaderOutput::unchanged()
        .with_artifact(new_path, content.clone())
        .without_content(),
    )
  }
}

/// The path with its hash component removed, or `None` if it has none.
pub fn remove_hash(path: &str) -> Option<String> {
  let (dir, name) = match path.rfind('/') {
    Some(i) => (&path[..=i], &path[i + 1..]),
    None => ("", path),
  };

  let parts: Vec<&str> = name.split('.').collect();
  if parts.len() < 3 {
    return None;
  }

  let hash_index = (1..parts.len() - 1)
    .rev()
    .find(|&i| is_hash(parts[i]))?;

  let kept: Vec<&str> = parts
    .iter()
    .enumerate()
    .filter(|(i, _)| *i != hash_index)
    .map(|(_, part)| *part)
    .collect();

  Some(format!("{}{}", dir, kept.join(".")))
}

fn is_hash(part: &str) -> bool {
  part.len() >= MIN_HASH_LEN && part.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::loader::{Content, ContentChange};
  use crate::report::PluginLogger;

  #[test]
  fn removes_rightmost_hex_component() {
    assert_eq!(remove_hash("build/main.3f2a9c1d.js").as_deref(), Some("build/main.js"));
    assert_eq!(remove_hash("a.b.cafe.deadbeef.css").as_deref(), Some("a.b.cafe.css"));
  }

  #[test]
  fn ignores_names_without_hash() {
    assert_eq!(remove_hash("src/main.js"), None);
    assert_eq!(remove_hash("src/main.chunk.js"), None);
    assert_eq!(remove_hash("cafe.js"), None);
  }

  #[test]
  fn versioned_names_are_not_hashes() {
    assert_eq!(remove_hash("lib/jquery-3.4.1.min.js"), None);
    assert_eq!(remove_hash("data.1.json"), None);
    assert_eq!(remove_hash("a.b.c.js"), None);
    assert_eq!(remove_hash("icon.1234567.svg"), None);
    assert_eq!(remove_hash("icon.12345678.svg").as_deref(), Some("icon.svg"));
  }

  #[tokio::test]
  async fn diverts_content_to_artifact() {
    let content = Content::Bytes(vec![0xff, 0x00]);
    let artifacts = BTreeMap::new();
    let log = PluginLogger::new("src/logo.a1b2c3d4.png");
    let ctx = LoaderContext {
      file_path: "src/logo.a1b2c3d4.png",
      content: Some(&content),
      extra_artifacts: &artifacts,
      log: &log,
    };

    let output = RemoveHashLoader.exec(&ctx, &serde_json::Value::Null).await.unwrap();

    assert_eq!(output.content, ContentChange::Remove);
    assert_eq!(output.extra_artifacts["src/logo.png"], Some(Content::Bytes(vec![0xff, 0x00])));
  }
}
