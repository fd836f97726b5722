//! `fslog config` subcommands
//!
//! Values are addressed by dotted key (`display.locale`). Every command
//! honors the `FSLOG_CONFIG` override.

use anyhow::{Context, Result};
use fslog_cli::system_config::{self, CONFIG_ENV, KEYS};
use owo_colors::OwoColorize;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "fslog Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for key in KEYS {
        let (prefix, name) = key.split_once('.').unwrap_or(("", *key));
        if prefix != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", prefix).yellow());
            section = prefix;
        }
        println!("  {} = {}", name.cyan(), config.get(key)?);
    }

    println!("\n{}", "Valid Values:".bold());
    println!("  display.locale: en, zh-cn");
    println!("  display.zone: local, utc");
    println!("  display.format: text, json");
    println!("  log.filter: any tracing filter (e.g. info, fslog_watcher=debug)");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    config.set(key, value)?;

    // Validate before saving
    config.validate()
        .context("Invalid configuration value")?;

    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Print where the config lives, creating it with defaults on request
pub async fn run_path(create: bool) -> Result<()> {
    if create {
        let created = !system_config::config_file_path().is_some_and(|path| path.exists());
        let path = system_config::init_if_missing()?;
        if created {
            println!("{} Wrote default config to {}", "✓".green(), path.display());
        } else {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let path = system_config::config_file_path()
        .context("Could not determine config file path")?;
    println!("{}", path.display());

    if std::env::var_os(CONFIG_ENV).is_some() {
        println!("{}", format!("(set by {})", CONFIG_ENV).dimmed());
    }
    if !path.exists() {
        println!(
            "{}",
            "Config file does not exist yet; defaults are in use. Pass --create to write it."
                .yellow()
        );
    }

    Ok(())
}

/// Print an annotated config suitable for `config.toml`
pub async fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}
