//! Raw change records as delivered by a notification source

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Kind of filesystem entry a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Type tag of a raw change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Entry appeared at the path
    Appeared,
    /// Entry contents changed
    Modified,
    /// Entry disappeared from the path
    Disappeared,
    /// Entry moved from `relative_path_moved_from` to the path
    Moved,
    /// Any record type this crate does not understand
    #[serde(other)]
    Unknown,
}

/// Capability of a filesystem entry handle
///
/// The core only reads the kind and, for files, the last-modified time.
/// Implementations live with the notification source.
#[async_trait]
pub trait EntryHandle: Send + Sync + fmt::Debug {
    /// Kind of the entry
    fn kind(&self) -> EntryKind;

    /// Current last-modified time of the entry
    ///
    /// Fails when the entry no longer exists.
    async fn last_modified(&self) -> std::io::Result<SystemTime>;
}

/// One notification describing a single filesystem change
#[derive(Debug, Clone)]
pub struct RawChangeRecord {
    /// What happened
    pub change_type: ChangeType,
    /// The affected entry
    pub changed_handle: Arc<dyn EntryHandle>,
    /// Root-relative path segments of the current path
    pub relative_path_components: Vec<String>,
    /// Root-relative path segments of the previous path (moves only)
    pub relative_path_moved_from: Option<Vec<String>>,
}

impl RawChangeRecord {
    /// Create a record without a previous path
    pub fn new(
        change_type: ChangeType,
        changed_handle: Arc<dyn EntryHandle>,
        relative_path_components: Vec<String>,
    ) -> Self {
        Self {
            change_type,
            changed_handle,
            relative_path_components,
            relative_path_moved_from: None,
        }
    }

    /// Create a `Moved` record
    pub fn moved(
        changed_handle: Arc<dyn EntryHandle>,
        relative_path_components: Vec<String>,
        relative_path_moved_from: Vec<String>,
    ) -> Self {
        Self {
            change_type: ChangeType::Moved,
            changed_handle,
            relative_path_components,
            relative_path_moved_from: Some(relative_path_moved_from),
        }
    }
}

/// Join path segments with `/`
pub fn join_segments(segments: &[String]) -> String {
    segments.join("/")
}

/// Split a `/`-separated path into segments
///
/// Convenience for building records by hand.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/').map(str::to_owned).collect()
}
