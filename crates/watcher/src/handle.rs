//! Filesystem-backed entry handles

use crate::error::{Result, WatchError};
use async_trait::async_trait;
use fslog_core::{EntryHandle, EntryKind};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Handle to an entry on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsHandle {
    path: PathBuf,
    kind: EntryKind,
}

impl FsHandle {
    /// Create a handle for a path of known kind
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Open an existing entry, resolving its canonical path and kind
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = tokio::fs::canonicalize(path.as_ref()).await?;
        let metadata = tokio::fs::metadata(&path).await?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(Self { path, kind })
    }

    /// Open a directory to use as an observation root
    pub async fn open_dir(path: impl AsRef<Path>) -> Result<Self> {
        let handle = Self::open(path).await?;
        if handle.kind != EntryKind::Directory {
            return Err(WatchError::NotADirectory(handle.path));
        }
        Ok(handle)
    }

    /// Absolute path of the entry
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EntryHandle for FsHandle {
    fn kind(&self) -> EntryKind {
        self.kind
    }

    async fn last_modified(&self) -> io::Result<SystemTime> {
        tokio::fs::metadata(&self.path).await?.modified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_resolves_kind() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();

        let dir = FsHandle::open(temp_dir.path()).await.unwrap();
        assert_eq!(dir.kind(), EntryKind::Directory);

        let handle = FsHandle::open(&file).await.unwrap();
        assert_eq!(handle.kind(), EntryKind::File);

        assert!(matches!(
            FsHandle::open_dir(&file).await,
            Err(WatchError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_last_modified_reads_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();

        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_file_mtime(&file, FileTime::from_system_time(mtime)).unwrap();

        let handle = FsHandle::new(&file, EntryKind::File);
        assert_eq!(handle.last_modified().await.unwrap(), mtime);

        fs::remove_file(&file).unwrap();
        assert!(handle.last_modified().await.is_err());
    }
}
