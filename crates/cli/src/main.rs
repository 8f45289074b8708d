use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keel_lib::LoadError;

mod cmd;
mod output;

use cmd::{Session, cmd_fetch, cmd_show, cmd_track};
use output::{print_error, print_hint};

/// keel - load build element graphs across projects
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  /// Project directory
  #[arg(short = 'C', long, global = true, default_value = ".")]
  directory: PathBuf,

  /// User configuration file
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Load elements and print the resolved dependency graph
  Show {
    /// Element files, relative to the project's element path
    #[arg(required = true)]
    targets: Vec<String>,

    /// Fetch junctioned subprojects when needed
    #[arg(long)]
    fetch: bool,

    /// Print the graph as JSON
    #[arg(long)]
    json: bool,
  },

  /// Fetch the sources of elements and their dependencies
  Fetch {
    #[arg(required = true)]
    targets: Vec<String>,
  },

  /// Resolve new refs for the sources of elements
  Track {
    #[arg(required = true)]
    targets: Vec<String>,

    /// Show new refs without writing them
    #[arg(long)]
    dry_run: bool,
  },
}

fn init_tracing(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let session = Session::open(&cli.directory, cli.config.as_deref())?;

  match cli.command {
    Commands::Show { targets, fetch, json } => cmd_show(session, &targets, fetch, json),
    Commands::Fetch { targets } => cmd_fetch(session, &targets),
    Commands::Track { targets, dry_run } => cmd_track(session, &targets, dry_run),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      if let Some(detail) = e.chain().find_map(|cause| cause.downcast_ref::<LoadError>()?.detail()) {
        print_hint(&detail);
      }
      ExitCode::FAILURE
    }
  }
}
