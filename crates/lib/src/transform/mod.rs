//! Per-file loader chain execution.
//!
//! The engine owns all encoding bookkeeping. Between stages a file's content
//! and extra artifacts are kept as bytes; before each stage they are decoded
//! into the stage's declared encoding (or left as bytes for binary stages),
//! and whatever the stage returns is encoded back with that same encoding.
//! Stages never see content in another stage's encoding.
//!
//! Virtual files requested by a stage are run through their own matched
//! chain, and written, before the next stage of the emitting file starts.
//! Once the chain is done the remaining content and every artifact are
//! written below the destination package directory.

mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, trace};

use crate::consts::MAX_VIRTUAL_FILE_DEPTH;
use crate::loader::{Content, ContentChange, LoaderContext, LoaderOutput, VirtualFile};
use crate::package::PackageDescriptor;
use crate::project::ProjectConfig;
use crate::report::{LogEntry, PluginLogger};
use crate::rules::{LoaderDescriptor, RuleMatcher};
use crate::util::path::{normalize, strip_dir};

pub use types::*;

/// Source tag of the engine's own diagnostics.
const RULES_LOG_SOURCE: &str = "rules";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Mutable state of one top-level file's processing, shared with the virtual
/// files it spawns.
#[derive(Default)]
struct Run {
  emitted: BTreeSet<String>,
  written: Vec<PathBuf>,
  logs: BTreeMap<String, Vec<LogEntry>>,
}

/// A file's content between stages.
struct FileState {
  content: Option<Vec<u8>>,
  artifacts: BTreeMap<String, Vec<u8>>,
}

/// Source and destination of the package a file belongs to.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
  src: &'a PackageDescriptor,
  dest: &'a PackageDescriptor,
}

/// Runs loader chains and writes their results.
#[derive(Debug, Clone)]
pub struct TransformEngine {
  config: Arc<ProjectConfig>,
  rules: Arc<RuleMatcher>,
}

impl TransformEngine {
  pub fn new(config: Arc<ProjectConfig>, rules: Arc<RuleMatcher>) -> Self {
    Self { config, rules }
  }

  pub fn rules(&self) -> &RuleMatcher {
    &self.rules
  }

  /// Copy a file byte for byte to its destination.
  pub async fn copy(
    &self,
    src: &PackageDescriptor,
    dest: &PackageDescriptor,
    file: &str,
  ) -> Result<FileOutcome, FileFailure> {
    match self.copy_file(Target { src, dest }, file).await {
      Ok(out) => Ok(FileOutcome {
        file: file.to_string(),
        written: vec![out],
        logs: BTreeMap::new(),
      }),
      Err(error) => Err(FileFailure {
        error,
        logs: BTreeMap::new(),
      }),
    }
  }

  async fn copy_file(&self, target: Target<'_>, file: &str) -> Result<PathBuf, TransformError> {
    let out = self.dest_path(target, file, file)?;
    if let Some(parent) = out.parent() {
      fs::create_dir_all(parent).await.map_err(|source| TransformError::Write {
        file: file.to_string(),
        path: parent.to_path_buf(),
        source,
      })?;
    }
    fs::copy(self.config.dir.join(file), &out)
      .await
      .map_err(|source| TransformError::Write {
        file: file.to_string(),
        path: out.clone(),
        source,
      })?;
    trace!(file, dest = %out.display(), "copied");
    Ok(out)
  }

  /// Run `file` through its matched loader chain and write the results.
  pub async fn process(
    &self,
    src: &PackageDescriptor,
    dest: &PackageDescriptor,
    file: &str,
  ) -> Result<FileOutcome, FileFailure> {
    let target = Target { src, dest };
    let mut run = Run::default();
    run.emitted.insert(file.to_string());

    let path = self.config.dir.join(file);
    let result = match fs::read(&path).await {
      Ok(bytes) => self.run_file(target, file.to_string(), bytes, 0, &mut run).await,
      Err(source) => Err(TransformError::Read {
        file: file.to_string(),
        path,
        source,
      }),
    };

    match result {
      Ok(()) => Ok(FileOutcome {
        file: file.to_string(),
        written: run.written,
        logs: run.logs,
      }),
      Err(error) => Err(FileFailure { error, logs: run.logs }),
    }
  }

  /// Process one (possibly virtual) file; boxed for recursion.
  fn run_file<'a>(
    &'a self,
    target: Target<'a>,
    file: String,
    bytes: Vec<u8>,
    depth: usize,
    run: &'a mut Run,
  ) -> BoxFuture<'a, Result<(), TransformError>> {
    Box::pin(async move {
      let chain = self.rules.resolve(&file);
      let log = PluginLogger::new(file.as_str());

      let result = self.run_chain(target, &file, bytes, &chain, depth, &log, run).await;
      if let Ok(state) = &result {
        for artifact in state.artifacts.keys() {
          log.info(RULES_LOG_SOURCE, format!("Rules emitted artifact: {}", artifact));
        }
      }

      let entries = log.take();
      if !entries.is_empty() {
        run.logs.entry(file.clone()).or_default().extend(entries);
      }

      let state = result?;
      self.write(target, &file, state, run).await
    })
  }

  #[allow(clippy::too_many_arguments)]
  async fn run_chain(
    &self,
    target: Target<'_>,
    file: &str,
    bytes: Vec<u8>,
    chain: &[LoaderDescriptor],
    depth: usize,
    log: &PluginLogger,
    run: &mut Run,
  ) -> Result<FileState, TransformError> {
    let mut state = FileState {
      content: Some(bytes),
      artifacts: BTreeMap::new(),
    };

    for stage in chain {
      let content = state.content.as_deref().map(|b| decode(stage, b));
      let artifacts: BTreeMap<String, Content> =
        state.artifacts.iter().map(|(path, b)| (path.clone(), decode(stage, b))).collect();

      let ctx = LoaderContext {
        file_path: file,
        content: content.as_ref(),
        extra_artifacts: &artifacts,
        log,
      };

      trace!(file, loader = %stage.id, "running loader");
      let output = stage
        .loader
        .exec(&ctx, &stage.options)
        .await
        .map_err(|e| TransformError::Loader {
          file: file.to_string(),
          loader: stage.id.clone(),
          source: e.in_loader(&stage.id),
        })?;

      let virtual_files = merge(&mut state, stage, file, output)?;

      for virtual_file in virtual_files {
        let path = self.virtual_path(target, file, &virtual_file.path)?;
        if depth + 1 > MAX_VIRTUAL_FILE_DEPTH {
          return Err(TransformError::TooDeep {
            file: file.to_string(),
            depth: MAX_VIRTUAL_FILE_DEPTH,
          });
        }
        if !run.emitted.insert(path.clone()) {
          return Err(TransformError::AlreadyEmitted {
            file: file.to_string(),
            path,
          });
        }
        debug!(file, virtual_file = %path, loader = %stage.id, "processing virtual file");
        log.info(RULES_LOG_SOURCE, format!("Rules emitted file: {}", path));
        self.run_file(target, path, virtual_file.content, depth + 1, run).await?;
      }
    }

    Ok(state)
  }

  /// Write remaining content and artifacts below the destination package.
  async fn write(
    &self,
    target: Target<'_>,
    file: &str,
    state: FileState,
    run: &mut Run,
  ) -> Result<(), TransformError> {
    let outputs = state
      .content
      .map(|content| (file.to_string(), content))
      .into_iter()
      .chain(state.artifacts);

    for (path, bytes) in outputs {
      let out = self.dest_path(target, file, &path)?;
      if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).await.map_err(|source| TransformError::Write {
          file: file.to_string(),
          path: parent.to_path_buf(),
          source,
        })?;
      }
      fs::write(&out, &bytes).await.map_err(|source| TransformError::Write {
        file: file.to_string(),
        path: out.clone(),
        source,
      })?;
      trace!(file, dest = %out.display(), "written");
      run.written.push(out);
    }

    Ok(())
  }

  /// Normalize a virtual file path and check it stays inside the package.
  fn virtual_path(&self, target: Target<'_>, file: &str, path: &str) -> Result<String, TransformError> {
    let outside = || TransformError::OutsidePackage {
      file: file.to_string(),
      path: path.to_string(),
    };
    let normalized = normalize(path).ok_or_else(outside)?;
    strip_dir(&normalized, &target.src.posix_dir()).ok_or_else(outside)?;
    Ok(normalized)
  }

  /// Destination of a project-relative output path.
  ///
  /// The path is made relative to the source package; for the root package
  /// the first matching source prefix is stripped as well.
  fn dest_path(&self, target: Target<'_>, file: &str, path: &str) -> Result<PathBuf, TransformError> {
    let outside = || TransformError::OutsidePackage {
      file: file.to_string(),
      path: path.to_string(),
    };
    let normalized = normalize(path).ok_or_else(outside)?;
    let src_dir = target.src.posix_dir();
    let mut rel = strip_dir(&normalized, &src_dir).ok_or_else(outside)?;

    if target.src.is_root
      && let Some(stripped) = self.config.sources.iter().find_map(|source| strip_dir(rel, source))
    {
      rel = stripped;
    }

    if rel.is_empty() {
      return Err(outside());
    }
    Ok(join_posix(&target.dest.dir, rel))
  }
}

fn join_posix(base: &Path, rel: &str) -> PathBuf {
  rel.split('/').fold(base.to_path_buf(), |path, segment| path.join(segment))
}

fn decode(stage: &LoaderDescriptor, bytes: &[u8]) -> Content {
  match stage.encoding {
    Some(encoding) => Content::Text(encoding.decode(bytes)),
    None => Content::Bytes(bytes.to_vec()),
  }
}

/// Turn content returned by `stage` back into bytes.
fn encode(stage: &LoaderDescriptor, file: &str, content: Content) -> Result<Vec<u8>, TransformError> {
  match (stage.encoding, content) {
    (Some(encoding), Content::Text(text)) => encoding.encode(&text).map_err(|source| TransformError::Encoding {
      file: file.to_string(),
      loader: stage.id.clone(),
      source,
    }),
    (None, Content::Bytes(bytes)) => Ok(bytes),
    (expected, actual) => Err(TransformError::ContentKind {
      file: file.to_string(),
      loader: stage.id.clone(),
      expected: if expected.is_some() { "text" } else { "binary" },
      actual: actual.kind(),
    }),
  }
}

/// Merge a stage's output into the file state, returning requested virtual files.
fn merge(
  state: &mut FileState,
  stage: &LoaderDescriptor,
  file: &str,
  output: LoaderOutput,
) -> Result<Vec<VirtualFile>, TransformError> {
  match output.content {
    ContentChange::Keep => {}
    ContentChange::Replace(content) => state.content = Some(encode(stage, file, content)?),
    ContentChange::Remove => state.content = None,
  }

  for (path, artifact) in output.extra_artifacts {
    match artifact {
      Some(content) => {
        state.artifacts.insert(path, encode(stage, file, content)?);
      }
      None => {
        state.artifacts.remove(&path);
      }
    }
  }

  Ok(output.virtual_files)
}
