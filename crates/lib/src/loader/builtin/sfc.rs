//! Single-file component loader.
//!
//! Splits a component file into its parts and feeds them back through the
//! pipeline as virtual files:
//!
//! - `<file>.js`: the `<script>` block, plus the `<template>` markup exported
//!   as `exports.template`.
//! - `<file>.<lang>`: every unscoped `<style>` block of the same `lang`
//!   (default `css`), concatenated in document order.
//!
//! The component file itself produces no output.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::missing_content;
use crate::loader::{Loader, LoaderContext, LoaderError, LoaderOutput};

pub const ID: &str = "sfc";

static SCRIPT_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<script(?P<attrs>[^>]*)>(?P<body>.*?)</script>").expect("valid regex"));
static TEMPLATE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<template(?P<attrs>[^>]*)>(?P<body>.*)</template>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<style(?P<attrs>[^>]*)>(?P<body>.*?)</style>").expect("valid regex"));
static LANG_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"\blang\s*=\s*["']([^"']+)["']"#).expect("valid regex"));
static SRC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bsrc\s*=").expect("valid regex"));
static SCOPED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bscoped\b").expect("valid regex"));

pub struct SfcLoader;

#[async_trait]
impl Loader for SfcLoader {
  async fn exec(&self, ctx: &LoaderContext<'_>, _options: &serde_json::Value) -> Result<LoaderOutput, LoaderError> {
    let source = ctx.text().ok_or_else(|| missing_content(ID, ctx.file_path))?;
    let action = format!("processing '{}'", ctx.file_path);

    let blocks = [&*SCRIPT_RE, &*TEMPLATE_RE, &*STYLE_RE];
    if blocks
      .iter()
      .flat_map(|re| re.captures_iter(source))
      .any(|caps| SRC_RE.is_match(&caps["attrs"]))
    {
      return Err(LoaderError::new(action, "src imports are not yet supported"));
    }

    let script = SCRIPT_RE
      .captures(source)
      .map(|caps| caps["body"].trim().to_string())
      .ok_or_else(|| LoaderError::new(action.clone(), "component has no <script> block"))?;

    let mut module = script;
    module.push('\n');
    if let Some(caps) = TEMPLATE_RE.captures(source) {
      let template = serde_json::to_string(caps["body"].trim())
        .map_err(|e| LoaderError::new(action.clone(), e.to_string()))?;
      module.push_str(&format!("exports.template = {};\n", template));
    }

    let mut styles: BTreeMap<String, String> = BTreeMap::new();
    for caps in STYLE_RE.captures_iter(source) {
      let attrs = &caps["attrs"];
      if SCOPED_RE.is_match(attrs) {
        ctx.log.warn(ID, "Scoped styles are not supported: your component may look bad");
        continue;
      }
      let lang = LANG_RE
        .captures(attrs)
        .map(|l| l[1].to_string())
        .unwrap_or_else(|| "css".to_string());
      let sheet = styles.entry(lang).or_default();
      sheet.push_str(caps["body"].trim());
      sheet.push('\n');
    }

    let mut output = LoaderOutput::unchanged()
      .without_content()
      .with_virtual_file(format!("{}.js", ctx.file_path), module.into_bytes());
    for (lang, sheet) in styles {
      output = output.with_virtual_file(format!("{}.{}", ctx.file_path, lang), sheet.into_bytes());
    }

    ctx.log.info(ID, "Compiled file");
    Ok(output)
  }
}
