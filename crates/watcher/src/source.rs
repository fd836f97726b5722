//! Notification source abstraction
//!
//! A source turns some underlying watch primitive into batches of raw
//! change records. The observer consumes batches one at a time, in arrival
//! order.

use crate::error::{Result, WatchError};
use crate::handle::FsHandle;
use async_trait::async_trait;
use fslog_core::RawChangeRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Options for observing a root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    /// Watch the whole subtree rather than a single level
    #[serde(default = "default_true")]
    pub recursive: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self { recursive: true }
    }
}

fn default_true() -> bool {
    true
}

/// A batch of raw records delivered together
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    /// Records in delivery order (may be empty)
    pub records: Vec<RawChangeRecord>,
    /// Root the records are relative to
    pub root: Arc<FsHandle>,
}

/// Producer of raw change batches
#[async_trait]
pub trait NotificationSource: Send {
    /// Begin watching `root`
    fn observe(&mut self, root: Arc<FsHandle>, options: ObserveOptions) -> Result<()>;

    /// Stop watching `root`
    fn unobserve(&mut self, root: &Path) -> Result<()>;

    /// Stop watching every root
    fn disconnect(&mut self);

    /// Next delivered batch, or `None` once the source is closed
    async fn next_batch(&mut self) -> Option<ChangeBatch>;
}

/// Channel-backed source fed by hand
///
/// Used for deterministic tests and for hosts that already have their own
/// change feed.
#[derive(Debug)]
pub struct ManualSource {
    batches: mpsc::UnboundedReceiver<ChangeBatch>,
    roots: Vec<(Arc<FsHandle>, ObserveOptions)>,
}

/// Sending half of a [`ManualSource`]
#[derive(Debug, Clone)]
pub struct BatchSender {
    tx: mpsc::UnboundedSender<ChangeBatch>,
}

impl BatchSender {
    /// Deliver a batch; returns false if the source is gone
    pub fn send(&self, batch: ChangeBatch) -> bool {
        self.tx.send(batch).is_ok()
    }
}

impl ManualSource {
    /// Create a source and its sending half
    ///
    /// The source closes once every sender is dropped.
    pub fn channel() -> (Self, BatchSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            batches: rx,
            roots: Vec::new(),
        };
        (source, BatchSender { tx })
    }

    /// Roots currently observed
    pub fn roots(&self) -> impl Iterator<Item = (&FsHandle, ObserveOptions)> {
        self.roots.iter().map(|(root, options)| (root.as_ref(), *options))
    }
}

#[async_trait]
impl NotificationSource for ManualSource {
    fn observe(&mut self, root: Arc<FsHandle>, options: ObserveOptions) -> Result<()> {
        self.roots.retain(|(existing, _)| existing.path() != root.path());
        self.roots.push((root, options));
        Ok(())
    }

    fn unobserve(&mut self, root: &Path) -> Result<()> {
        let before = self.roots.len();
        self.roots.retain(|(existing, _)| existing.path() != root);
        if self.roots.len() == before {
            return Err(WatchError::NotObserved(root.to_path_buf()));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.roots.clear();
        self.batches.close();
    }

    async fn next_batch(&mut self) -> Option<ChangeBatch> {
        self.batches.recv().await
    }
}
