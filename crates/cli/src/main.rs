//! changetrack CLI - ctrack command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod logging;
mod system_config;
mod util;

/// changetrack - which files changed since your branch left mainline
#[derive(Parser)]
#[command(name = "ctrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this config file instead of the system one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files changed against the baseline
    Changed {
        /// Repository root (default: discovered from the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Print JSON instead of a file list
        #[arg(long)]
        json: bool,
    },
    /// Show the baseline commit changes are measured against
    Baseline {
        /// Repository root (default: discovered from the current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Track changes continuously until interrupted
    Watch {
        /// Repository root (default: discovered from the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Also write logs to a daily rolling file in this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,

    /// Get a single configuration value
    Get {
        /// Key such as `tracker.queue_interval_ms`
        key: String,
    },

    /// Show the config file path
    Path {
        /// Create the file with defaults if it does not exist
        #[arg(long)]
        create: bool,
    },

    /// Print an example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match &cli.command {
        Commands::Watch { log_dir, .. } => log_dir.as_deref(),
        _ => None,
    };
    // Must outlive every log call
    let _log_guard = logging::init(cli.verbose, log_dir)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Changed { root, json } => cmd::changed::run(root, json, config_path).await,
        Commands::Baseline { root } => cmd::baseline::run(root, config_path).await,
        Commands::Watch { root, .. } => cmd::watch::run(root, config_path).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(config_path).await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key, config_path).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
