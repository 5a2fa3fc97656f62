//! simscore CLI: score generated text against references from the terminal.
//!
//! Loads a dataset, scores it with the built-in metrics, prints a per-tag
//! summary and optionally records the run in a SQLite registry.

mod commands;
mod output;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// simscore: weighted multi-metric scoring with bootstrap confidence intervals
#[derive(Parser, Debug)]
#[command(name = "simscore", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.simscore/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Score a dataset and summarize it per tag
    Evaluate(EvaluateArgs),
    /// Inspect recorded runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
    /// List the registered metrics
    Metrics,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
struct EvaluateArgs {
    /// Path to a .jsonl, .json or .csv dataset
    #[arg(short, long)]
    data: PathBuf,

    /// Metric weights as name=value (repeat the flag; replaces configured weights)
    #[arg(long = "weights", value_name = "NAME=VALUE")]
    weights: Vec<String>,

    /// CSV file to write every scored row to
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// SQLite database to record this run in
    #[arg(long)]
    database: Option<PathBuf>,

    /// Notes stored with the recorded run
    #[arg(long)]
    notes: Option<String>,

    /// Column summarized per tag ("score" or a metric name)
    #[arg(long)]
    metric: Option<String>,

    /// Number of top rows to print
    #[arg(long)]
    top: Option<usize>,

    /// Bootstrap iterations
    #[arg(long)]
    iterations: Option<usize>,

    /// Bootstrap significance level, in (0, 1)
    #[arg(long)]
    alpha: Option<f64>,

    /// Seed for reproducible confidence intervals
    #[arg(long)]
    seed: Option<u64>,

    /// Score records on the current thread only
    #[arg(long)]
    sequential: bool,
}

#[derive(clap::Subcommand, Debug)]
enum RunsAction {
    /// List recorded runs, newest first
    List {
        /// SQLite database path
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Show one run and its per-metric means
    Show {
        /// Run identifier
        run_id: String,
        /// SQLite database path
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Compare per-metric means of two runs
    Compare {
        /// Baseline run identifier
        baseline: String,
        /// Candidate run identifier
        candidate: String,
        /// SQLite database path
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "simscore", "simscore")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "simscore.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    commands::handle_command(cli.command, &workspace)
}
