//! Error types for filesystem observation

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or tearing down observation
#[derive(Debug, Error)]
pub enum WatchError {
    /// The host cannot provide change notifications
    #[error("filesystem observation is not supported: {0}")]
    Unsupported(String),

    /// Error reported by the OS watcher backend
    #[error("watcher backend error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error while resolving a handle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Observation roots must be directories
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Path was never passed to `observe`
    #[error("path is not being observed: {}", .0.display())]
    NotObserved(PathBuf),
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
