//! Filesystem activity log core
//!
//! This crate provides:
//! - Raw change record model and the entry handle capability
//! - Record classification (create/remove/modify/move/rename)
//! - Log entry construction with authoritative time selection
//! - Fixed vocabulary tables for rendered descriptions
//! - Append-only in-memory activity log

pub mod builder;
pub mod classify;
pub mod entry;
pub mod log;
pub mod record;
pub mod vocabulary;

// Re-exports
pub use builder::{Clock, LogBuilder, SystemClock};
pub use classify::{classify, discriminate_move, Classification, Operation};
pub use entry::LogEntry;
pub use log::ActivityLog;
pub use record::{join_segments, split_path, ChangeType, EntryHandle, EntryKind, RawChangeRecord};
pub use vocabulary::{DisplayZone, Locale, RenderOptions};
