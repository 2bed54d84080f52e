//! JSON loader: emits `<file>.js` exporting the parsed document.

use async_trait::async_trait;

use super::missing_content;
use crate::loader::{Loader, LoaderContext, LoaderError, LoaderOutput};

pub const ID: &str = "json";

pub struct JsonLoader;

#[async_trait]
impl Loader for JsonLoader {
  async fn exec(&self, ctx: &LoaderContext<'_>, _options: &serde_json::Value) -> Result<LoaderOutput, LoaderError> {
    let text = ctx.text().ok_or_else(|| missing_content(ID, ctx.file_path))?;

    serde_json::from_str::<serde_json::Value>(text)
      .map_err(|e| LoaderError::new(format!("parsing {}", ctx.file_path), e.to_string()))?;

    let literal =
      serde_json::to_string(text).map_err(|e| LoaderError::new(format!("embedding {}", ctx.file_path), e.to_string()))?;
    let module = format!("module.exports = JSON.parse({});\n", literal);

    ctx.log.info(ID, "Generated .js module");
    Ok(LoaderOutput::unchanged().with_artifact(format!("{}.js", ctx.file_path), module))
  }
}
