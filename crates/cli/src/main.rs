//! fslog CLI - narrate filesystem activity

use anyhow::Result;
use clap::{Parser, Subcommand};
use fslog_cli::system_config::{self, SystemConfig};
use fslog_core::Locale;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

/// fslog - Human-readable activity log for a directory tree
#[derive(Parser)]
#[command(name = "fslog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and print each change as it happens
    Watch {
        /// Directory to watch
        path: PathBuf,

        /// Watch only the top level of the directory
        #[arg(long)]
        no_recursive: bool,

        /// Description language (en, zh-cn)
        #[arg(long)]
        locale: Option<Locale>,

        /// Render timestamps in UTC
        #[arg(long)]
        utc: bool,

        /// Print one JSON object per entry
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value
    Get {
        /// Dotted key, e.g. display.locale
        key: String,
    },
    /// Set a single value
    Set {
        /// Dotted key, e.g. display.locale
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config errors are reported after tracing is up
    let loaded = system_config::load();
    let filter = match &loaded {
        Ok(config) => config.log.filter.clone(),
        Err(_) => SystemConfig::default().log.filter,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Watch { path, no_recursive, locale, utc, json, no_color } => {
            let config = loaded?;
            let args = cmd::watch::WatchArgs {
                path: &path,
                no_recursive,
                locale,
                utc,
                json,
                no_color,
            };
            cmd::watch::run(&config, args).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
