//! pledgeprep CLI: fetch the pledge dataset and write train/val/test splits.
//!
//! Running without a subcommand performs the full preparation run.

mod commands;

use clap::Parser;
use pledgeprep_core::PrepOverrides;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Prepare reproducible train/val/test splits of the pledge dataset
#[derive(Parser, Debug)]
#[command(name = "pledgeprep", version, about, long_about = None)]
struct Cli {
    /// Workspace directory; relative paths are resolved against it
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (defaults to <workspace>/pledgeprep.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local dataset cache (TSV)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Output directory for the split files
    #[arg(long)]
    split_dir: Option<PathBuf>,

    /// Remote URL fetched when the dataset cache is missing
    #[arg(long)]
    url: Option<String>,

    /// Seed for the stratified train/val draw
    #[arg(long)]
    seed: Option<u64>,

    /// Share of the train pool drawn into val
    #[arg(long)]
    val_fraction: Option<f64>,

    /// Also write manifest.json next to the split files
    #[arg(long)]
    manifest: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch, map, split and write the split files (default)
    Run,
    /// Download the dataset if it is not cached yet
    Fetch,
    /// Report row counts per split tag and label without writing splits
    Inspect {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

impl Cli {
    fn overrides(&self) -> PrepOverrides {
        PrepOverrides {
            dataset_url: self.url.clone(),
            dataset_path: self.dataset.clone(),
            split_dir: self.split_dir.clone(),
            val_fraction: self.val_fraction,
            seed: self.seed,
            write_manifest: self.manifest.then_some(true),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "pledgeprep", "pledgeprep")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "pledgeprep.log");
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
    let overrides = cli.overrides();

    let command = cli.command.unwrap_or(Commands::Run);
    commands::handle_command(command, &workspace, cli.config.as_deref(), &overrides).await
}
