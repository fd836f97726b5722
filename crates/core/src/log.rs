//! Append-only in-memory activity log

use crate::entry::LogEntry;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered, append-only sequence of log entries
///
/// Entries are ordered by insertion. Reads hand out shared snapshots; the
/// only mutation is the append performed by [`crate::LogBuilder`].
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: RwLock<Vec<Arc<LogEntry>>>,
}

impl ActivityLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, assigning its sequence number
    ///
    /// The sequence number is taken under the write lock so that numbering
    /// always matches insertion order.
    pub(crate) fn append_with(&self, make: impl FnOnce(u64) -> LogEntry) -> Arc<LogEntry> {
        let mut entries = self.entries.write();
        let entry = Arc::new(make(entries.len() as u64));
        entries.push(Arc::clone(&entry));
        entry
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all entries in insertion order
    pub fn entries(&self) -> Vec<Arc<LogEntry>> {
        self.entries.read().clone()
    }

    /// Get an entry by sequence number
    pub fn get(&self, seq: u64) -> Option<Arc<LogEntry>> {
        let index = usize::try_from(seq).ok()?;
        self.entries.read().get(index).cloned()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<Arc<LogEntry>> {
        self.entries.read().last().cloned()
    }

    /// Last N entries in insertion order
    pub fn last_n(&self, count: usize) -> Vec<Arc<LogEntry>> {
        let entries = self.entries.read();
        let start = entries.len().saturating_sub(count);
        entries[start..].to_vec()
    }

    /// Entries whose event time is at or after `time`
    pub fn since(&self, time: DateTime<Utc>) -> Vec<Arc<LogEntry>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.time >= time)
            .cloned()
            .collect()
    }
}
