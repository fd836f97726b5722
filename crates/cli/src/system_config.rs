//! User configuration for the fslog CLI
//!
//! Loaded from `<config_dir>/fslog/config.toml`, or from the path in
//! `FSLOG_CONFIG` when set. Missing files and missing keys fall back to
//! defaults; command-line flags override file values.

use anyhow::{Context, Result};
use fslog_core::{DisplayZone, Locale};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "FSLOG_CONFIG";

/// Complete CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Observation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Watch subdirectories (default: true)
    #[serde(default = "default_true")]
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { recursive: true }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Description language (default: en)
    #[serde(default)]
    pub locale: Locale,

    /// Time zone for rendered timestamps (default: local)
    #[serde(default)]
    pub zone: DisplayZone,

    /// Output format (default: text)
    #[serde(default)]
    pub format: OutputFormat,

    /// Colorize text output (default: true)
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            zone: DisplayZone::default(),
            format: OutputFormat::default(),
            color: true,
        }
    }
}

/// Diagnostics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Tracing filter used when RUST_LOG is unset (default: warn)
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// How entries are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered description per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_filter() -> String {
    "warn".to_string()
}

fn parse_zone(value: &str) -> Result<DisplayZone> {
    match value {
        "local" => Ok(DisplayZone::Local),
        "utc" => Ok(DisplayZone::Utc),
        other => anyhow::bail!("Invalid zone '{}': must be 'local' or 'utc'", other),
    }
}

fn zone_name(zone: DisplayZone) -> &'static str {
    match zone {
        DisplayZone::Local => "local",
        DisplayZone::Utc => "utc",
    }
}

/// Keys accepted by `get` and `set`
pub const KEYS: &[&str] = &[
    "watch.recursive",
    "display.locale",
    "display.zone",
    "display.format",
    "display.color",
    "log.filter",
];

impl SystemConfig {
    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.log.filter.trim().is_empty() {
            anyhow::bail!("log.filter must not be empty");
        }
        Ok(())
    }

    /// Read a value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "watch.recursive" => self.watch.recursive.to_string(),
            "display.locale" => self.display.locale.to_string(),
            "display.zone" => zone_name(self.display.zone).to_string(),
            "display.format" => self.display.format.to_string(),
            "display.color" => self.display.color.to_string(),
            "log.filter" => self.log.filter.clone(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'fslog config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }

    /// Set a value by dotted key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "watch.recursive" => {
                self.watch.recursive = value
                    .parse()
                    .context("Invalid value: must be 'true' or 'false'")?;
            }
            "display.locale" => {
                self.display.locale = value.parse().map_err(anyhow::Error::msg)?;
            }
            "display.zone" => {
                self.display.zone = parse_zone(value)?;
            }
            "display.format" => {
                self.display.format = value.parse().map_err(anyhow::Error::msg)?;
            }
            "display.color" => {
                self.display.color = value
                    .parse()
                    .context("Invalid value: must be 'true' or 'false'")?;
            }
            "log.filter" => {
                self.log.filter = value.to_string();
            }
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'fslog config list' to see available keys.",
                key
            ),
        }
        Ok(())
    }
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("fslog").join("config.toml"))
}

/// Load the config, using defaults when no file exists
pub fn load() -> Result<SystemConfig> {
    match config_file_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Ok(SystemConfig::default()),
    }
}

/// Load and validate a config file
pub fn load_from(path: &Path) -> Result<SystemConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Write the config to its default location
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(config, &path)
}

/// Write the config to `path`, creating parent directories
pub fn save_to(config: &SystemConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}

/// Create the config file with defaults if it does not exist
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save_to(&SystemConfig::default(), &path)?;
    }
    Ok(path)
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# fslog configuration

[watch]
# Watch subdirectories as well as the root
recursive = true

[display]
# Description language: "en" or "zh-cn"
locale = "en"
# Timestamp zone: "local" or "utc"
zone = "local"
# Output format: "text" or "json"
format = "text"
# Colorize text output
color = true

[log]
# Diagnostics filter used when RUST_LOG is unset
filter = "warn"
"#
}
