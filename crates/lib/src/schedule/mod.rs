//! Bounded-concurrency file processing.
//!
//! Every file of every scheduled package becomes one task. A single semaphore
//! bounds the number of tasks in flight across all packages, so one large
//! package cannot starve the others. A permit is taken before a task is
//! spawned and held until the file (and every virtual file it spawns) is
//! written.
//!
//! Failures do not cancel anything: in-flight and queued files still run, and
//! every failure is collected.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::package::PackageDescriptor;
use crate::transform::{FileFailure, FileOutcome, TransformEngine, TransformError};

/// The files of one package to process.
#[derive(Debug, Clone)]
pub struct PackageJob {
  pub src: PackageDescriptor,
  pub dest: PackageDescriptor,
  /// Project-relative POSIX paths.
  pub files: Vec<String>,
}

/// Outcome of a scheduling run.
#[derive(Debug, Default)]
pub struct ScheduleResult {
  pub completed: Vec<FileOutcome>,
  pub failed: Vec<FileFailure>,
}

impl ScheduleResult {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty()
  }
}

/// Drives the transform engine over many files with a global concurrency cap.
#[derive(Debug, Clone)]
pub struct Scheduler {
  engine: Arc<TransformEngine>,
  semaphore: Arc<Semaphore>,
}

impl Scheduler {
  /// `max_parallel_files` must be at least 1.
  pub fn new(engine: Arc<TransformEngine>, max_parallel_files: usize) -> Self {
    Self {
      engine,
      semaphore: Arc::new(Semaphore::new(max_parallel_files.max(1))),
    }
  }

  /// Process every file of `jobs`; resolves once all files completed or failed.
  ///
  /// Files matching no rule are copied verbatim.
  pub async fn run(&self, jobs: Vec<PackageJob>) -> ScheduleResult {
    let mut join_set = JoinSet::new();
    let mut result = ScheduleResult::default();
    let mut tasks: HashMap<Id, String> = HashMap::new();
    let total: usize = jobs.iter().map(|j| j.files.len()).sum();

    for job in jobs {
      debug!(package = %job.src.id, files = job.files.len(), "scheduling package");
      let src = Arc::new(job.src);
      let dest = Arc::new(job.dest);

      for file in job.files {
        let permit = match self.semaphore.clone().acquire_owned().await {
          Ok(permit) => permit,
          Err(e) => {
            result.failed.push(FileFailure {
              error: TransformError::Task {
                file,
                message: e.to_string(),
              },
              logs: Default::default(),
            });
            continue;
          }
        };

        let engine = self.engine.clone();
        let src = src.clone();
        let dest = dest.clone();
        let name = file.clone();

        let handle = join_set.spawn(async move {
          let _permit = permit;
          if engine.rules().resolve(&file).is_empty() {
            engine.copy(&src, &dest, &file).await
          } else {
            engine.process(&src, &dest, &file).await
          }
        });
        tasks.insert(handle.id(), name);

        while let Some(joined) = join_set.try_join_next() {
          collect(&mut result, &tasks, joined);
        }
      }
    }

    while let Some(joined) = join_set.join_next().await {
      collect(&mut result, &tasks, joined);
    }

    info!(
      files = total,
      completed = result.completed.len(),
      failed = result.failed.len(),
      "processed files"
    );
    result
  }
}

/// Record one finished task; `tasks` maps task ids to the file they process.
fn collect(
  result: &mut ScheduleResult,
  tasks: &HashMap<Id, String>,
  joined: Result<Result<FileOutcome, FileFailure>, JoinError>,
) {
  match joined {
    Ok(Ok(outcome)) => result.completed.push(outcome),
    Ok(Err(failure)) => {
      error!(file = %failure.error.file(), error = %failure.error, "file failed");
      result.failed.push(failure);
    }
    Err(e) => {
      let file = tasks.get(&e.id()).cloned().unwrap_or_else(|| "<unknown>".to_string());
      error!(file = %file, error = %e, "file task panicked");
      result.failed.push(FileFailure {
        error: TransformError::Task {
          file,
          message: e.to_string(),
        },
        logs: Default::default(),
      });
    }
  }
}
