//! File system observation for fslog
//!
//! This crate provides:
//! - The notification source abstraction and a `notify`-backed source
//! - Filesystem entry handles
//! - The observer shell that feeds the activity log
//! - A manual source for deterministic tests and custom feeds

pub mod error;
pub mod handle;
pub mod notify_source;
pub mod observer;
pub mod source;

// Re-exports
pub use error::{Result, WatchError};
pub use handle::FsHandle;
pub use notify_source::NotifySource;
pub use observer::{Callback, Capability, FsObserver};
pub use source::{BatchSender, ChangeBatch, ManualSource, NotificationSource, ObserveOptions};
