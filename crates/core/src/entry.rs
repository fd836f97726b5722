//! Log entry data structures

use crate::classify::Operation;
use crate::record::{EntryHandle, EntryKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Weak};

/// Structured, rendered record of one classified change
///
/// Entries are immutable once appended to the log.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Insertion index in the owning log
    pub seq: u64,
    /// Kind of the affected entry
    pub kind: EntryKind,
    /// Classified operation
    pub operation: Operation,
    /// Authoritative event time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    /// Previous path (moves and renames only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Current path
    pub to: String,
    /// Human-readable description
    pub description: String,
    /// Back-reference to the originating handle
    #[serde(skip)]
    pub handle: Weak<dyn EntryHandle>,
}

impl LogEntry {
    /// Event time as milliseconds since the Unix epoch
    pub fn unix_ms(&self) -> i64 {
        self.time.timestamp_millis()
    }

    /// Upgrade the handle back-reference if the handle is still alive
    pub fn handle(&self) -> Option<Arc<dyn EntryHandle>> {
        self.handle.upgrade()
    }
}
