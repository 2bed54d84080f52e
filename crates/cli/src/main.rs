mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "BUNDLER_LOG";

/// bundler - turns a project and its installed dependencies into a deployable output tree
#[derive(Parser)]
#[command(name = "bundler")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory (default: current directory)
  #[arg(short = 'C', long, global = true, default_value = ".")]
  project: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output_format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the project into its output directory
  Build {
    /// Output directory, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of files processed at once
    #[arg(long)]
    max_parallel_files: Option<usize>,

    /// Write the JSON diagnostics report to this file
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Ignore the build manifest and reprocess every package
    #[arg(long)]
    full: bool,
  },

  /// Show the packages taking part in a build
  Deps,

  /// Show which packages would be reprocessed
  Status,

  /// Show the loader chain each path resolves to
  Rules {
    /// Files to look up, relative to the project directory
    #[arg(required = true)]
    paths: Vec<PathBuf>,
  },

  /// Remove the output directory and the build manifest
  Clean,
}

fn main() {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_env(LOG_ENV)
    .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    output::print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let project = cli.project.as_path();
  let format = cli.output_format;

  match cli.command {
    Commands::Build {
      output,
      max_parallel_files,
      report_file,
      full,
    } => cmd::cmd_build(
      project,
      cmd::BuildArgs {
        output,
        max_parallel_files,
        report_file,
        full,
        verbose: cli.verbose,
      },
      format,
    ),
    Commands::Deps => cmd::cmd_deps(project, cli.verbose, format),
    Commands::Status => cmd::cmd_status(project, cli.verbose, format),
    Commands::Rules { paths } => cmd::cmd_rules(project, &paths, format),
    Commands::Clean => cmd::cmd_clean(project, format),
  }
}
