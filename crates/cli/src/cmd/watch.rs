//! Watch a directory and print its activity log

use anyhow::{Context, Result};
use fslog_cli::output;
use fslog_cli::system_config::{OutputFormat, SystemConfig};
use fslog_core::{DisplayZone, Locale, RenderOptions};
use fslog_watcher::{Capability, FsHandle, FsObserver, ObserveOptions};
use owo_colors::OwoColorize;
use std::path::Path;

/// Command-line overrides for the configured defaults
pub struct WatchArgs<'a> {
    pub path: &'a Path,
    pub no_recursive: bool,
    pub locale: Option<Locale>,
    pub utc: bool,
    pub json: bool,
    pub no_color: bool,
}

pub async fn run(config: &SystemConfig, args: WatchArgs<'_>) -> Result<()> {
    let options = ObserveOptions {
        recursive: config.watch.recursive && !args.no_recursive,
    };
    let render = RenderOptions {
        locale: args.locale.unwrap_or(config.display.locale),
        zone: if args.utc {
            DisplayZone::Utc
        } else {
            config.display.zone
        },
    };
    let format = if args.json {
        OutputFormat::Json
    } else {
        config.display.format
    };
    let color = config.display.color && !args.no_color;

    let root = FsHandle::open_dir(args.path)
        .await
        .with_context(|| format!("Cannot watch {}", args.path.display()))?;
    let root_display = root.path().display().to_string();

    let mut observer = FsObserver::with_render_options(render, move |entry, _records, _root| {
        match output::format_entry(entry, format, color) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to format entry {}: {}", entry.seq, e),
        }
    });

    if let Capability::Unsupported { reason } = observer.capability() {
        anyhow::bail!("Filesystem observation is not supported on this host: {}", reason);
    }

    observer
        .observe(root, options)
        .with_context(|| format!("Failed to observe {}", root_display))?;

    eprintln!(
        "{} {} {}",
        "Watching".bold(),
        root_display,
        "(Ctrl-C to stop)".dimmed()
    );

    observer
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    observer.disconnect();

    let entries = observer.log().entries();
    let summary = output::summarize(entries.iter().map(|entry| entry.as_ref()));
    eprintln!("\n{} {} entries", "Recorded".bold(), entries.len());
    for (operation, count) in summary {
        eprintln!("  {:?}: {}", operation, count);
    }

    Ok(())
}
