//! Observer shell
//!
//! Holds one notification source, one callback and the activity log. Each
//! delivered batch is classified, turned into a log entry and handed back
//! to the callback. Batches are processed one at a time in arrival order,
//! so appends always follow delivery order.

use crate::error::Result;
use crate::handle::FsHandle;
use crate::notify_source::NotifySource;
use crate::source::{ChangeBatch, NotificationSource, ObserveOptions};
use fslog_core::{ActivityLog, Clock, LogBuilder, LogEntry, RawChangeRecord, RenderOptions};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Callback invoked with each new entry, the raw batch and the batch root
pub type Callback = Box<dyn FnMut(&Arc<LogEntry>, &[RawChangeRecord], &FsHandle) + Send>;

/// Result of probing the host for change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// Observation is available
    Supported,
    /// Observation is unavailable; the observer is inert
    Unsupported {
        /// Why the probe failed
        reason: String,
    },
}

impl Capability {
    /// Whether observation is available
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Supported)
    }
}

/// Turns delivered change batches into an activity log
pub struct FsObserver<S = NotifySource> {
    source: Option<S>,
    capability: Capability,
    builder: LogBuilder,
    callback: Callback,
}

impl FsObserver<NotifySource> {
    /// Create an observer over the platform watcher
    ///
    /// If the host cannot provide change notifications the condition is
    /// reported once and the observer stays inert.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&Arc<LogEntry>, &[RawChangeRecord], &FsHandle) + Send + 'static,
    {
        Self::with_render_options(RenderOptions::default(), callback)
    }

    /// Create an observer over the platform watcher with custom rendering
    pub fn with_render_options<F>(render: RenderOptions, callback: F) -> Self
    where
        F: FnMut(&Arc<LogEntry>, &[RawChangeRecord], &FsHandle) + Send + 'static,
    {
        match NotifySource::new() {
            Ok(source) => Self::with_source(source, render, callback),
            Err(e) => {
                error!("{}", e);
                Self {
                    source: None,
                    capability: Capability::Unsupported {
                        reason: e.to_string(),
                    },
                    builder: LogBuilder::new(Arc::new(ActivityLog::new()), render),
                    callback: Box::new(callback),
                }
            }
        }
    }
}

impl<S: NotificationSource> FsObserver<S> {
    /// Create an observer over an explicit source
    pub fn with_source<F>(source: S, render: RenderOptions, callback: F) -> Self
    where
        F: FnMut(&Arc<LogEntry>, &[RawChangeRecord], &FsHandle) + Send + 'static,
    {
        Self {
            source: Some(source),
            capability: Capability::Supported,
            builder: LogBuilder::new(Arc::new(ActivityLog::new()), render),
            callback: Box::new(callback),
        }
    }

    /// Replace the wall-clock source used for detection times
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.builder = self.builder.with_clock(clock);
        self
    }

    /// Outcome of the construction-time capability probe
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Entries produced so far
    pub fn log(&self) -> &Arc<ActivityLog> {
        self.builder.log()
    }

    /// Start watching a root
    ///
    /// No-op when the observer is inert.
    pub fn observe(&mut self, root: FsHandle, options: ObserveOptions) -> Result<()> {
        match self.source.as_mut() {
            Some(source) => source.observe(Arc::new(root), options),
            None => {
                debug!("Observer inert, ignoring observe({})", root.path().display());
                Ok(())
            }
        }
    }

    /// Stop watching a root
    pub fn unobserve(&mut self, root: &Path) -> Result<()> {
        match self.source.as_mut() {
            Some(source) => source.unobserve(root),
            None => Ok(()),
        }
    }

    /// Stop watching every root; `run` returns once pending batches drain
    pub fn disconnect(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.disconnect();
        }
    }

    /// Process batches until the source closes
    pub async fn run(&mut self) {
        let Some(source) = self.source.as_mut() else {
            debug!("Observer inert, nothing to run");
            return;
        };

        while let Some(batch) = source.next_batch().await {
            Self::handle(&self.builder, &mut self.callback, batch).await;
        }

        info!("Notification source closed");
    }

    /// Process batches until the source closes or `shutdown` resolves
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => info!("Observer shutting down"),
        }
    }

    /// Process one delivered batch
    ///
    /// Only the first record of a batch is logged. Returns the appended
    /// entry, or `None` for empty batches and records with no operation.
    pub async fn process_batch(&mut self, batch: ChangeBatch) -> Option<Arc<LogEntry>> {
        Self::handle(&self.builder, &mut self.callback, batch).await
    }

    async fn handle(
        builder: &LogBuilder,
        callback: &mut Callback,
        batch: ChangeBatch,
    ) -> Option<Arc<LogEntry>> {
        let Some(first) = batch.records.first() else {
            debug!("Ignoring empty batch");
            return None;
        };

        if batch.records.len() > 1 {
            debug!(
                "Batch of {} records, logging only the first",
                batch.records.len()
            );
        }

        let entry = builder.record(first).await?;
        callback(&entry, &batch.records, &batch.root);
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BatchSender, ManualSource};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use fslog_core::{
        split_path, ChangeType, DisplayZone, EntryHandle, EntryKind, Locale, Operation,
    };
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};

    #[derive(Debug)]
    struct StubHandle {
        kind: EntryKind,
        modified: SystemTime,
    }

    #[async_trait]
    impl EntryHandle for StubHandle {
        fn kind(&self) -> EntryKind {
            self.kind
        }

        async fn last_modified(&self) -> io::Result<SystemTime> {
            Ok(self.modified)
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    type Seen = Arc<Mutex<Vec<(String, usize, PathBuf)>>>;

    fn mtime() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn detected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn root() -> Arc<FsHandle> {
        Arc::new(FsHandle::new("/watched", EntryKind::Directory))
    }

    fn file() -> Arc<dyn EntryHandle> {
        Arc::new(StubHandle {
            kind: EntryKind::File,
            modified: mtime(),
        })
    }

    fn observer() -> (FsObserver<ManualSource>, BatchSender, Seen) {
        let (source, sender) = ManualSource::channel();
        let seen: Seen = Arc::default();
        let sink = seen.clone();
        let render = RenderOptions {
            locale: Locale::En,
            zone: DisplayZone::Utc,
        };

        let observer = FsObserver::with_source(source, render, move |entry, records, root| {
            sink.lock().unwrap().push((
                entry.to.clone(),
                records.len(),
                root.path().to_path_buf(),
            ));
        })
        .with_clock(Arc::new(FixedClock(detected())));

        (observer, sender, seen)
    }

    fn batch(records: Vec<RawChangeRecord>) -> ChangeBatch {
        ChangeBatch {
            records,
            root: root(),
        }
    }

    #[tokio::test]
    async fn test_created_file_scenario() {
        let (mut observer, _sender, seen) = observer();
        let record = RawChangeRecord::new(ChangeType::Appeared, file(), split_path("a/b.txt"));

        let entry = observer.process_batch(batch(vec![record])).await.unwrap();

        assert_eq!(entry.operation, Operation::Create);
        assert_eq!(entry.to, "a/b.txt");
        assert_eq!(entry.time, DateTime::<Utc>::from(mtime()));
        assert!(entry.description.ends_with("a/b.txt"));
        assert_eq!(observer.log().len(), 1);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[("a/b.txt".to_string(), 1, PathBuf::from("/watched"))]
        );
    }

    #[tokio::test]
    async fn test_rename_and_move_scenarios() {
        let (mut observer, _sender, _seen) = observer();

        let rename = RawChangeRecord::moved(file(), split_path("x/b.txt"), split_path("x/a.txt"));
        let entry = observer.process_batch(batch(vec![rename])).await.unwrap();
        assert_eq!(entry.operation, Operation::Rename);
        assert_eq!(entry.from.as_deref(), Some("x/a.txt"));
        assert_eq!(entry.to, "x/b.txt");

        let relocate = RawChangeRecord::moved(file(), split_path("y/b.txt"), split_path("x/b.txt"));
        let entry = observer.process_batch(batch(vec![relocate])).await.unwrap();
        assert_eq!(entry.operation, Operation::Move);
        assert_eq!(entry.from.as_deref(), Some("x/b.txt"));
        assert_eq!(entry.to, "y/b.txt");
    }

    #[tokio::test]
    async fn test_removal_uses_detection_time() {
        let (mut observer, _sender, _seen) = observer();
        let record = RawChangeRecord::new(ChangeType::Disappeared, file(), split_path("a/b.txt"));

        let entry = observer.process_batch(batch(vec![record])).await.unwrap();

        assert_eq!(entry.operation, Operation::Remove);
        assert_eq!(entry.time, detected());
    }

    #[tokio::test]
    async fn test_empty_batch_leaves_log_unchanged() {
        let (mut observer, _sender, seen) = observer();

        assert!(observer.process_batch(batch(Vec::new())).await.is_none());
        assert!(observer.log().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_record_skips_callback() {
        let (mut observer, _sender, seen) = observer();
        let record = RawChangeRecord::new(ChangeType::Unknown, file(), split_path("a"));

        assert!(observer.process_batch(batch(vec![record])).await.is_none());
        assert!(observer.log().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_first_record_of_batch_is_logged() {
        let (mut observer, _sender, seen) = observer();
        let records = vec![
            RawChangeRecord::new(ChangeType::Appeared, file(), split_path("first")),
            RawChangeRecord::new(ChangeType::Appeared, file(), split_path("second")),
        ];

        observer.process_batch(batch(records)).await.unwrap();

        assert_eq!(observer.log().len(), 1);
        assert_eq!(observer.log().latest().unwrap().to, "first");
        assert_eq!(seen.lock().unwrap()[0].1, 2);
    }

    #[tokio::test]
    async fn test_run_preserves_arrival_order() {
        let (mut observer, sender, seen) = observer();

        for path in ["one", "two", "three"] {
            let record = RawChangeRecord::new(ChangeType::Modified, file(), split_path(path));
            assert!(sender.send(batch(vec![record])));
        }
        assert!(sender.send(batch(Vec::new())));
        drop(sender);

        observer.run().await;

        let logged: Vec<_> = observer.log().entries().iter().map(|e| e.to.clone()).collect();
        assert_eq!(logged, vec!["one", "two", "three"]);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let (mut observer, _sender, _seen) = observer();

        observer.run_until(async {}).await;

        assert!(observer.log().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_closes_source() {
        let (mut observer, sender, _seen) = observer();
        observer.observe(FsHandle::new("/watched", EntryKind::Directory), ObserveOptions::default())
            .unwrap();

        observer.disconnect();
        assert!(!sender.send(batch(Vec::new())));

        observer.run().await;
        assert!(observer.unobserve(Path::new("/watched")).is_err());
    }

    #[tokio::test]
    async fn test_logged_handle_outlives_batch() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = FsHandle::open_dir(temp_dir.path()).await.unwrap();
        let file = root.path().join("kept.txt");

        let source = NotifySource::new().unwrap();
        let mut observer = FsObserver::with_source(source, RenderOptions::default(), |_, _, _| {});
        observer.observe(root, ObserveOptions::default()).unwrap();
        let log = observer.log().clone();

        std::fs::write(&file, b"kept").unwrap();
        observer
            .run_until(async {
                while log.is_empty() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await;

        let entry = log.entries().into_iter().next().unwrap();
        assert_eq!(entry.to, "kept.txt");
        let handle = entry.handle().unwrap();
        assert_eq!(handle.kind(), EntryKind::File);
        assert!(handle.last_modified().await.is_ok());
    }

    #[tokio::test]
    async fn test_real_rename_logs_one_entry() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("x")).unwrap();
        std::fs::write(temp_dir.path().join("x").join("a.txt"), b"a").unwrap();
        let root = FsHandle::open_dir(temp_dir.path()).await.unwrap();
        let (from, to) = (root.path().join("x/a.txt"), root.path().join("x/b.txt"));

        let source = NotifySource::new().unwrap();
        let mut observer = FsObserver::with_source(source, RenderOptions::default(), |_, _, _| {});
        observer.observe(root, ObserveOptions::default()).unwrap();
        let log = observer.log().clone();

        std::fs::rename(&from, &to).unwrap();
        observer
            .run_until(async {
                while log.is_empty() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                // Leave room for stray halves to surface
                tokio::time::sleep(Duration::from_millis(1500)).await;
            })
            .await;

        let entries = log.entries();
        assert_eq!(entries.len(), 1, "entries: {:?}", entries);
        assert_eq!(entries[0].operation, Operation::Rename);
        assert_eq!(entries[0].from.as_deref(), Some("x/a.txt"));
        assert_eq!(entries[0].to, "x/b.txt");
        assert!(entries[0].handle().is_some());
    }

    #[tokio::test]
    async fn test_inert_observer_ignores_calls() {
        let mut observer: FsObserver<ManualSource> = FsObserver {
            source: None,
            capability: Capability::Unsupported {
                reason: "no watcher".to_string(),
            },
            builder: LogBuilder::new(Arc::new(ActivityLog::new()), RenderOptions::default()),
            callback: Box::new(|_, _, _| {}),
        };

        assert!(!observer.capability().is_supported());
        observer
            .observe(FsHandle::new("/watched", EntryKind::Directory), ObserveOptions::default())
            .unwrap();
        observer.run().await;
        assert!(observer.log().is_empty());
    }
}
