//! Printing log entries

use crate::system_config::OutputFormat;
use anyhow::Result;
use fslog_core::{LogEntry, Operation};
use owo_colors::OwoColorize;

/// Render one entry for stdout
pub fn format_entry(entry: &LogEntry, format: OutputFormat, color: bool) -> Result<String> {
    let line = match format {
        OutputFormat::Json => serde_json::to_string(entry)?,
        OutputFormat::Text if color => match entry.operation {
            Operation::Create => entry.description.green().to_string(),
            Operation::Remove => entry.description.red().to_string(),
            Operation::Modify => entry.description.yellow().to_string(),
            Operation::Move | Operation::Rename => entry.description.cyan().to_string(),
        },
        OutputFormat::Text => entry.description.clone(),
    };
    Ok(line)
}

/// Count entries per operation, in a fixed order
pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Vec<(Operation, usize)> {
    let mut counts = [
        (Operation::Create, 0),
        (Operation::Modify, 0),
        (Operation::Remove, 0),
        (Operation::Move, 0),
        (Operation::Rename, 0),
    ];

    for entry in entries {
        if let Some((_, count)) = counts.iter_mut().find(|(op, _)| *op == entry.operation) {
            *count += 1;
        }
    }

    counts.into_iter().filter(|(_, count)| *count > 0).collect()
}
