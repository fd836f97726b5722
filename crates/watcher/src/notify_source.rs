//! Notification source backed by the `notify` crate
//!
//! OS events are translated into raw change records relative to the
//! observed root:
//! - Create -> Appeared
//! - Rename with both paths -> Moved
//! - Rename source / target halves -> paired into Moved, otherwise
//!   Disappeared / Appeared once they expire
//! - Other modifications -> Modified
//! - Remove -> Disappeared
//! - Access and unclassified events -> Unknown
//!
//! Some backends (inotify) report one rename as a `From` half, a `To` half
//! and a combined `Both` event. Halves are held briefly so that a rename
//! produces exactly one record.

use crate::error::{Result, WatchError};
use crate::handle::FsHandle;
use crate::source::{ChangeBatch, NotificationSource, ObserveOptions};
use async_trait::async_trait;
use fslog_core::{ChangeType, EntryHandle, EntryKind, RawChangeRecord};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Source delivering OS filesystem events
pub struct NotifySource {
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    roots: Vec<Arc<FsHandle>>,
    directories: DirectoryIndex,
    handles: HandleRegistry,
    renames: PendingRenames,
    ready: VecDeque<ChangeBatch>,
    connected: bool,
}

impl NotifySource {
    /// Create the platform watcher
    ///
    /// Fails when the host cannot provide change notifications.
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the source was dropped
            let _ = tx.send(res);
        })
        .map_err(|e| WatchError::Unsupported(e.to_string()))?;

        Ok(Self {
            watcher,
            events: rx,
            roots: Vec::new(),
            directories: DirectoryIndex::default(),
            handles: HandleRegistry::default(),
            renames: PendingRenames::default(),
            ready: VecDeque::new(),
            connected: true,
        })
    }

    /// Roots currently observed
    pub fn roots(&self) -> &[Arc<FsHandle>] {
        &self.roots
    }

    /// Translate one OS event into zero or more batches
    ///
    /// Expired rename halves are flushed first so they keep their place
    /// ahead of the new event. Each record gets its own batch.
    fn translate(&mut self, event: Event, now: Instant) -> Vec<ChangeBatch> {
        let mut batches = self.expire(now);

        match event.kind {
            EventKind::Create(kind) => {
                let hint = match kind {
                    CreateKind::File => Some(EntryKind::File),
                    CreateKind::Folder => Some(EntryKind::Directory),
                    _ => None,
                };
                for path in &event.paths {
                    batches.extend(self.record(ChangeType::Appeared, path, hint));
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to] = event.paths.as_slice() {
                    self.renames.settle(from);
                    batches.extend(self.moved(from, to));
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                let tracker = event.attrs.tracker();
                for path in event.paths {
                    self.renames.push_from(now, tracker, path);
                }
                batches.extend(self.evict());
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let tracker = event.attrs.tracker();
                for path in event.paths {
                    if let Some(path) = self.renames.pair_to(tracker, path) {
                        // Moved in from outside the watch
                        batches.extend(self.record(ChangeType::Appeared, &path, None));
                    }
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                // Unpaired rename: current existence tells which half it was
                for path in &event.paths {
                    let change_type = if path.symlink_metadata().is_ok() {
                        ChangeType::Appeared
                    } else {
                        ChangeType::Disappeared
                    };
                    batches.extend(self.record(change_type, path, None));
                }
            }
            EventKind::Modify(_) => {
                for path in &event.paths {
                    batches.extend(self.record(ChangeType::Modified, path, None));
                }
            }
            EventKind::Remove(kind) => {
                let hint = match kind {
                    RemoveKind::File => Some(EntryKind::File),
                    RemoveKind::Folder => Some(EntryKind::Directory),
                    _ => None,
                };
                for path in &event.paths {
                    batches.extend(self.record(ChangeType::Disappeared, path, hint));
                }
            }
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {
                for path in &event.paths {
                    batches.extend(self.record(ChangeType::Unknown, path, None));
                }
            }
        }

        batches
    }

    /// Resolve rename halves older than the pairing window
    fn expire(&mut self, now: Instant) -> Vec<ChangeBatch> {
        let expired = self.renames.expire(now);
        self.resolve(expired)
    }

    /// Resolve rename halves beyond the pending bound
    fn evict(&mut self) -> Vec<ChangeBatch> {
        let evicted = self.renames.evict();
        self.resolve(evicted)
    }

    fn resolve(&mut self, halves: Vec<PendingRename>) -> Vec<ChangeBatch> {
        let mut batches = Vec::new();
        for half in halves {
            match half.to {
                // Both halves seen but no combined event followed
                Some(to) => batches.extend(self.moved(&half.from, &to)),
                // Moved out of the watch
                None => batches.extend(self.record(ChangeType::Disappeared, &half.from, None)),
            }
        }
        batches
    }

    /// Build a single-record batch for one path and keep the indexes current
    fn record(
        &mut self,
        change_type: ChangeType,
        path: &Path,
        hint: Option<EntryKind>,
    ) -> Option<ChangeBatch> {
        let root = self.root_for(path)?;
        let Some(components) = relative_components(root.path(), path) else {
            debug!("Skipping event on root: {}", path.display());
            return None;
        };

        let kind = self.directories.resolve(path, hint);
        let handle = match change_type {
            ChangeType::Appeared | ChangeType::Modified => {
                if change_type == ChangeType::Appeared && kind == EntryKind::Directory {
                    self.directories.insert(path);
                }
                self.handles.acquire(path, kind)
            }
            ChangeType::Disappeared => {
                self.directories.remove(path);
                self.handles.release(path, kind)
            }
            _ => Arc::new(FsHandle::new(path, kind)),
        };

        Some(ChangeBatch {
            records: vec![RawChangeRecord::new(change_type, handle, components)],
            root,
        })
    }

    /// Build a batch for a rename with both halves known
    fn moved(&mut self, from: &Path, to: &Path) -> Option<ChangeBatch> {
        let Some(root) = self.root_for(to) else {
            // Moved out of every root
            return self.record(ChangeType::Disappeared, from, None);
        };
        let Some(moved_from) = relative_components(root.path(), from) else {
            // Moved in from outside the root
            return self.record(ChangeType::Appeared, to, None);
        };
        let components = relative_components(root.path(), to)?;

        let kind = self.directories.resolve(to, None);
        self.directories.rename(from, to);
        self.handles.release(from, kind);
        let handle = self.handles.acquire(to, kind);

        Some(ChangeBatch {
            records: vec![RawChangeRecord::moved(handle, components, moved_from)],
            root,
        })
    }

    /// Most specific observed root containing `path`
    fn root_for(&self, path: &Path) -> Option<Arc<FsHandle>> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root.path()))
            .max_by_key(|root| root.path().components().count())
            .cloned()
    }
}

#[async_trait]
impl NotificationSource for NotifySource {
    fn observe(&mut self, root: Arc<FsHandle>, options: ObserveOptions) -> Result<()> {
        let mode = if options.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher.watch(root.path(), mode)?;
        self.directories.seed(root.path(), options.recursive);

        info!(
            "Observing {} ({})",
            root.path().display(),
            if options.recursive { "recursive" } else { "single level" }
        );

        self.roots.retain(|existing| existing.path() != root.path());
        self.roots.push(root);
        self.connected = true;
        Ok(())
    }

    fn unobserve(&mut self, root: &Path) -> Result<()> {
        let Some(index) = self.roots.iter().position(|existing| existing.path() == root) else {
            return Err(WatchError::NotObserved(root.to_path_buf()));
        };

        self.watcher.unwatch(root)?;
        self.roots.remove(index);
        self.directories.remove(root);
        self.handles.forget(root);
        info!("Stopped observing {}", root.display());
        Ok(())
    }

    fn disconnect(&mut self) {
        for root in self.roots.drain(..) {
            if let Err(e) = self.watcher.unwatch(root.path()) {
                warn!("Failed to unwatch {}: {}", root.path().display(), e);
            }
        }
        self.directories = DirectoryIndex::default();
        self.handles = HandleRegistry::default();
        self.renames = PendingRenames::default();
        self.ready.clear();
        self.connected = false;
    }

    async fn next_batch(&mut self) -> Option<ChangeBatch> {
        loop {
            if let Some(batch) = self.ready.pop_front() {
                return Some(batch);
            }
            if !self.connected {
                return None;
            }

            let received = match self.renames.deadline() {
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    match tokio::time::timeout_at(deadline, self.events.recv()).await {
                        Ok(received) => received,
                        Err(_) => {
                            let batches = self.expire(Instant::now());
                            self.ready.extend(batches);
                            continue;
                        }
                    }
                }
                None => self.events.recv().await,
            };

            match received {
                Some(Ok(event)) => {
                    debug!("Watcher event: {:?}", event);
                    let batches = self.translate(event, Instant::now());
                    self.ready.extend(batches);
                }
                Some(Err(e)) => warn!("Watcher error: {}", e),
                None => {
                    let halves = self.renames.drain();
                    let batches = self.resolve(halves);
                    self.ready.extend(batches);
                    self.connected = false;
                }
            }
        }
    }
}

/// A rename half waiting for its counterpart
#[derive(Debug)]
struct PendingRename {
    seen: Instant,
    tracker: Option<usize>,
    from: PathBuf,
    to: Option<PathBuf>,
}

/// Rename halves held until paired, settled by a combined event, or expired
#[derive(Debug, Default)]
struct PendingRenames {
    halves: VecDeque<PendingRename>,
}

impl PendingRenames {
    const MAX_AGE: Duration = Duration::from_millis(500);
    const MAX_PENDING: usize = 512;

    fn push_from(&mut self, now: Instant, tracker: Option<usize>, from: PathBuf) {
        self.halves.push_back(PendingRename {
            seen: now,
            tracker,
            from,
            to: None,
        });
    }

    /// Attach a target to the oldest open source half
    ///
    /// Returns the path back when no source half matches.
    fn pair_to(&mut self, tracker: Option<usize>, to: PathBuf) -> Option<PathBuf> {
        let open = self.halves.iter_mut().find(|half| {
            half.to.is_none()
                && match (half.tracker, tracker) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        });

        match open {
            Some(half) => {
                half.to = Some(to);
                None
            }
            None => Some(to),
        }
    }

    /// Drop halves covered by a combined rename event for `from`
    fn settle(&mut self, from: &Path) {
        self.halves.retain(|half| half.from != from);
    }

    fn expire(&mut self, now: Instant) -> Vec<PendingRename> {
        let mut expired = Vec::new();
        while let Some(half) = self.halves.front() {
            if now.saturating_duration_since(half.seen) < Self::MAX_AGE {
                break;
            }
            expired.extend(self.halves.pop_front());
        }
        expired
    }

    fn evict(&mut self) -> Vec<PendingRename> {
        let mut evicted = Vec::new();
        while self.halves.len() > Self::MAX_PENDING {
            evicted.extend(self.halves.pop_front());
        }
        evicted
    }

    fn drain(&mut self) -> Vec<PendingRename> {
        self.halves.drain(..).collect()
    }

    /// When the oldest half expires
    fn deadline(&self) -> Option<Instant> {
        self.halves.front().map(|half| half.seen + Self::MAX_AGE)
    }
}

/// Handles for entries that currently exist under the observed roots
///
/// Log entries only keep a weak reference, so the registry is what keeps a
/// handle alive until its entry disappears, moves away or stops being
/// observed.
#[derive(Debug, Default)]
struct HandleRegistry {
    handles: HashMap<PathBuf, Arc<FsHandle>>,
}

impl HandleRegistry {
    /// Handle for a live entry, reused while its kind is unchanged
    fn acquire(&mut self, path: &Path, kind: EntryKind) -> Arc<FsHandle> {
        match self.handles.get(path) {
            Some(handle) if handle.kind() == kind => handle.clone(),
            _ => {
                let handle = Arc::new(FsHandle::new(path, kind));
                self.handles.insert(path.to_path_buf(), handle.clone());
                handle
            }
        }
    }

    /// Take the handle of an entry that is gone, forgetting its subtree
    fn release(&mut self, path: &Path, kind: EntryKind) -> Arc<FsHandle> {
        let handle = self
            .handles
            .remove(path)
            .filter(|handle| handle.kind() == kind)
            .unwrap_or_else(|| Arc::new(FsHandle::new(path, kind)));
        self.forget(path);
        handle
    }

    /// Forget `path` and everything below it
    fn forget(&mut self, path: &Path) {
        self.handles.retain(|known, _| !known.starts_with(path));
    }
}

/// Root-relative path segments, or `None` for the root itself or paths outside it
fn relative_components(root: &Path, path: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    let components: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if components.is_empty() {
        None
    } else {
        Some(components)
    }
}

/// Known directories under the observed roots
///
/// Removed entries can no longer be inspected, so their kind is recovered
/// from what was seen while they existed.
#[derive(Debug, Default)]
struct DirectoryIndex {
    dirs: HashSet<PathBuf>,
}

impl DirectoryIndex {
    fn seed(&mut self, root: &Path, recursive: bool) {
        let max_depth = if recursive { usize::MAX } else { 1 };
        for entry in WalkDir::new(root)
            .follow_links(false)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                self.dirs.insert(entry.into_path());
            }
        }
    }

    fn resolve(&self, path: &Path, hint: Option<EntryKind>) -> EntryKind {
        if let Some(kind) = hint {
            return kind;
        }

        match path.symlink_metadata() {
            Ok(metadata) if metadata.is_dir() => EntryKind::Directory,
            Ok(_) => EntryKind::File,
            Err(_) if self.dirs.contains(path) => EntryKind::Directory,
            Err(_) => EntryKind::File,
        }
    }

    fn insert(&mut self, path: &Path) {
        self.dirs.insert(path.to_path_buf());
    }

    /// Forget `path` and everything below it
    fn remove(&mut self, path: &Path) {
        self.dirs.retain(|dir| !dir.starts_with(path));
    }

    fn rename(&mut self, from: &Path, to: &Path) {
        let moved: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|dir| dir.starts_with(from))
            .cloned()
            .collect();

        for dir in moved {
            self.dirs.remove(&dir);
            if let Ok(rest) = dir.strip_prefix(from) {
                self.dirs.insert(to.join(rest));
            }
        }
    }
}
