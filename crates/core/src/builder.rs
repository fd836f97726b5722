//! Log entry construction
//!
//! Resolves the authoritative event time for a classified change, renders
//! its description and appends the resulting entry to the activity log.

use crate::classify::{classify, Classification, Operation};
use crate::entry::LogEntry;
use crate::log::ActivityLog;
use crate::record::{EntryHandle, EntryKind, RawChangeRecord};
use crate::vocabulary::RenderOptions;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Builds log entries and appends them to a shared log
pub struct LogBuilder {
    log: Arc<ActivityLog>,
    render: RenderOptions,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LogBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuilder")
            .field("entries", &self.log.len())
            .field("render", &self.render)
            .finish()
    }
}

impl LogBuilder {
    /// Create a builder appending to `log`
    pub fn new(log: Arc<ActivityLog>, render: RenderOptions) -> Self {
        Self {
            log,
            render,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall-clock source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The log this builder appends to
    pub fn log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    /// Rendering settings
    pub fn render_options(&self) -> RenderOptions {
        self.render
    }

    /// Classify a record and build its entry
    ///
    /// Returns `None` when the record carries no operation.
    pub async fn record(&self, record: &RawChangeRecord) -> Option<Arc<LogEntry>> {
        let classification = classify(record)?;
        Some(self.build(&record.changed_handle, classification).await)
    }

    /// Build an entry for a classified change and append it to the log
    pub async fn build(
        &self,
        handle: &Arc<dyn EntryHandle>,
        classification: Classification,
    ) -> Arc<LogEntry> {
        let Classification { operation, to, from } = classification;
        let kind = handle.kind();
        let time = self.resolve_time(handle.as_ref(), kind, operation, &to).await;
        let description = self
            .render
            .describe(time, operation, kind, from.as_deref(), &to);

        debug!("{}", description);

        let handle = Arc::downgrade(handle);
        self.log.append_with(|seq| LogEntry {
            seq,
            kind,
            operation,
            time,
            from,
            to,
            description,
            handle,
        })
    }

    /// Pick the authoritative time for a change
    ///
    /// Files that still exist report their last-modified time. Directories
    /// and removals use the wall-clock time at detection, as does a file
    /// that vanished before it could be queried.
    async fn resolve_time(
        &self,
        handle: &dyn EntryHandle,
        kind: EntryKind,
        operation: Operation,
        path: &str,
    ) -> DateTime<Utc> {
        let detected_at = self.clock.now();

        if kind != EntryKind::File || operation == Operation::Remove {
            return detected_at;
        }

        match handle.last_modified().await {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                debug!("Metadata for {} unavailable ({}), using detection time", path, e);
                detected_at
            }
        }
    }
}
