//! Terminal rendering for the bundler commands.
//!
//! Status lines go to stdout, problems to stderr. Colors are only used when
//! the stream supports them.

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use bundler_lib::package::PackageId;
use bundler_lib::report::Report;
use bundler_lib::rules::LoaderDescriptor;
use bundler_lib::transform::TransformError;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

#[derive(Debug, Clone, Copy)]
enum Tone {
  Good,
  Bad,
  Caution,
  Note,
}

fn paint(text: &str, tone: Tone, stream: Stream) -> String {
  match tone {
    Tone::Good => text.if_supports_color(stream, |s| s.green()).to_string(),
    Tone::Bad => text.if_supports_color(stream, |s| s.red()).to_string(),
    Tone::Caution => text.if_supports_color(stream, |s| s.yellow()).to_string(),
    Tone::Note => text.if_supports_color(stream, |s| s.blue()).to_string(),
  }
}

pub fn print_success(message: &str) {
  println!("{} {}", paint(symbols::SUCCESS, Tone::Good, Stream::Stdout), message);
}

pub fn print_info(message: &str) {
  println!("{} {}", paint(symbols::INFO, Tone::Note, Stream::Stdout), message);
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    paint(symbols::ERROR, Tone::Bad, Stream::Stderr),
    paint(message, Tone::Bad, Stream::Stderr)
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    paint(symbols::WARNING, Tone::Caution, Stream::Stderr),
    paint(message, Tone::Caution, Stream::Stderr)
  );
}

pub fn print_stat(label: &str, value: impl std::fmt::Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// Where a package stands in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
  /// Reprocessed by this build.
  Processed,
  /// Output of an earlier build kept.
  Reused,
  /// Would be reprocessed by the next build.
  Dirty,
  /// Up to date.
  Clean,
}

impl PackageStatus {
  fn marker(self) -> (&'static str, Tone) {
    match self {
      PackageStatus::Processed => ("+", Tone::Good),
      PackageStatus::Reused => ("=", Tone::Note),
      PackageStatus::Dirty => ("~", Tone::Caution),
      PackageStatus::Clean => (symbols::SUCCESS, Tone::Good),
    }
  }
}

pub fn print_package(status: PackageStatus, id: &PackageId) {
  let (marker, tone) = status.marker();
  println!("  {} {}", paint(marker, tone, Stream::Stdout), id);
}

/// One line per failed file, sorted by file.
pub fn print_file_errors(errors: &[TransformError]) {
  let mut sorted: Vec<&TransformError> = errors.iter().collect();
  sorted.sort_by(|a, b| a.file().cmp(b.file()));
  for error in sorted {
    print_error(&error.to_string());
  }
}

/// Print the report's warnings and where to find the details.
///
/// Prints nothing when the build produced no warnings.
pub fn print_report_pointer(report: &Report, report_file: Option<&Path>) {
  if !report.has_warnings() {
    return;
  }
  for warning in &report.warnings {
    print_warning(warning);
  }
  match report_file {
    Some(path) => print_warning(&format!("See {} for details", path.display())),
    None => print_warning("Run with --report-file <FILE> to get a detailed report"),
  }
}

/// `css [utf-8] | remove-hash [binary]`, or `(copied verbatim)` for an empty chain.
pub fn format_chain(chain: &[LoaderDescriptor]) -> String {
  if chain.is_empty() {
    return "(copied verbatim)".to_string();
  }
  chain
    .iter()
    .map(|stage| match stage.encoding {
      Some(encoding) => format!("{} [{}]", stage.id, encoding),
      None => format!("{} [binary]", stage.id),
    })
    .collect::<Vec<_>>()
    .join(" | ")
}

/// Render a build duration recorded in milliseconds.
pub fn format_elapsed(ms: u128) -> String {
  match ms {
    0..=999 => format!("{}ms", ms),
    1_000..=59_999 => format!("{:.2}s", ms as f64 / 1000.0),
    _ => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000),
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
