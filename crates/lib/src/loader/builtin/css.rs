//! Stylesheet loader.
//!
//! Emits a companion `<file>.js` module that injects a `<link>` element
//! pointing at the stylesheet, so code can `require` the stylesheet like any
//! other module.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::{missing_content, parse_options};
use crate::loader::{Loader, LoaderContext, LoaderError, LoaderOutput};

pub const ID: &str = "css";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct CssOptions {
  /// Regex applied to the file path to compute the link href.
  rewrite: String,
  /// Replacement for `rewrite`, with `$n` group references.
  #[serde(rename = "as")]
  replacement: String,
  /// Whether the stylesheet itself is still written.
  keep_content: bool,
}

impl Default for CssOptions {
  fn default() -> Self {
    Self {
      rewrite: "(.*)".to_string(),
      replacement: "$1".to_string(),
      keep_content: true,
    }
  }
}

pub struct CssLoader;

#[async_trait]
impl Loader for CssLoader {
  async fn exec(&self, ctx: &LoaderContext<'_>, options: &serde_json::Value) -> Result<LoaderOutput, LoaderError> {
    let options: CssOptions = parse_options(ID, ctx.file_path, options)?;
    if ctx.text().is_none() {
      return Err(missing_content(ID, ctx.file_path));
    }

    let rewrite = Regex::new(&options.rewrite).map_err(|e| {
      LoaderError::new(
        format!("compiling 'rewrite' option for {}", ctx.file_path),
        e.to_string(),
      )
    })?;
    let href = rewrite.replace(ctx.file_path, options.replacement.as_str()).into_owned();

    let module = link_module(&href)
      .map_err(|e| LoaderError::new(format!("generating module for {}", ctx.file_path), e.to_string()))?;
    ctx.log.info(ID, format!("Generated .js module to inject '{}'", href));

    let output = LoaderOutput::unchanged().with_artifact(format!("{}.js", ctx.file_path), module);
    Ok(if options.keep_content {
      output
    } else {
      output.without_content()
    })
  }
}

fn link_module(href: &str) -> Result<String, serde_json::Error> {
  let href = serde_json::to_string(href)?;
  Ok(format!(
    "var link = document.createElement(\"link\");\n\
     link.setAttribute(\"rel\", \"stylesheet\");\n\
     link.setAttribute(\"type\", \"text/css\");\n\
     link.setAttribute(\"href\", {});\n\
     document.querySelector(\"head\").appendChild(link);\n",
    href
  ))
}
