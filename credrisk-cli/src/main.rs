//! credrisk CLI: runs the credit-risk ingestion and validation pipeline.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// credrisk: ingest credit-risk records and validate the train/test split
#[derive(Parser, Debug)]
#[command(name = "credrisk", version, about, long_about = None)]
struct Cli {
    /// Workspace directory; relative paths in the configuration resolve here
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (replaces the workspace credrisk.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for run artifacts
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Write artifacts directly under the artifact directory
    #[arg(long)]
    no_timestamp: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Ingest records, then validate the resulting split
    Run,
    /// Ingest records and write the train/test split
    Ingest,
    /// Validate an existing train/test pair
    Validate {
        /// Train dataset CSV
        #[arg(long)]
        train: PathBuf,
        /// Test dataset CSV
        #[arg(long)]
        test: PathBuf,
    },
    /// Seed the configured document collection from a CSV file
    Push {
        /// CSV file to upload
        csv: PathBuf,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

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

    let log_dir = cli.workspace.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "credrisk.log");
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
    tracing::debug!(workspace = %workspace.display(), "Resolved workspace");

    let overrides = credrisk_core::ConfigOverrides {
        artifact_dir: cli.artifact_dir.clone(),
        timestamped_artifacts: cli.no_timestamp.then_some(false),
    };
    let config = credrisk_core::load_config(
        Some(&workspace),
        cli.config.as_deref(),
        Some(&overrides),
    )
    .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let config = commands::resolve_paths(config, &workspace);

    commands::handle_command(cli.command, config)
}
