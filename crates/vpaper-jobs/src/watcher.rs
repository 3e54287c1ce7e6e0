//! Recursive directory watch feeding the dispatcher.

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use vpaper_core::defaults::WATCH_EVENT_CAPACITY;
use vpaper_core::{Error, Result};

/// Coarse kind of a filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Create,
    /// File content was written. Only these are scheduled for ingestion.
    Write,
    Remove,
    Other,
}

impl From<&EventKind> for FileEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => FileEventKind::Create,
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                FileEventKind::Write
            }
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => FileEventKind::Write,
            EventKind::Remove(_) => FileEventKind::Remove,
            _ => FileEventKind::Other,
        }
    }
}

/// A single path affected by a filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

/// Owns the OS watch. Dropping it releases the watch.
///
/// Events pass through a bounded channel, so a dispatcher stalled on full
/// worker queues also stalls the watch thread.
pub struct DirectoryWatcher {
    // dropped first so a watch thread blocked on a full channel is released
    events: mpsc::Receiver<FileEvent>,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Start watching `dir` and everything below it.
    pub fn watch(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Watch(format!("not a directory: {}", dir.display())));
        }

        let (tx, events) = mpsc::channel(WATCH_EVENT_CAPACITY);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let kind = FileEventKind::from(&event.kind);
                    for path in event.paths {
                        // runs on the notify thread, outside the runtime
                        if tx.blocking_send(FileEvent { path, kind }).is_err() {
                            // receiver gone means the dispatcher stopped
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Filesystem watch error"),
            }
        })
        .map_err(|e| Error::Watch(e.to_string()))?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| Error::Watch(format!("{}: {}", dir.display(), e)))?;
        debug!(dir = %dir.display(), "Watching directory");

        Ok(Self {
            events,
            _watcher: watcher,
        })
    }

    /// Next event. `None` once the watch has shut down.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.events.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(
            FileEventKind::from(&EventKind::Create(CreateKind::File)),
            FileEventKind::Create
        );
        assert_eq!(
            FileEventKind::from(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            FileEventKind::Write
        );
        assert_eq!(
            FileEventKind::from(&EventKind::Modify(ModifyKind::Any)),
            FileEventKind::Write
        );
        assert_eq!(
            FileEventKind::from(&EventKind::Access(AccessKind::Close(AccessMode::Write))),
            FileEventKind::Write
        );
        assert_eq!(
            FileEventKind::from(&EventKind::Remove(RemoveKind::File)),
            FileEventKind::Remove
        );
        assert_eq!(
            FileEventKind::from(&EventKind::Access(AccessKind::Read)),
            FileEventKind::Other
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_written_file_yields_write_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = DirectoryWatcher::watch(dir.path()).unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"scan").unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while let Some(event) = watcher.recv().await {
                if event.kind == FileEventKind::Write {
                    return Some(event);
                }
            }
            None
        })
        .await
        .expect("write event in time")
        .expect("watch open");
        assert_eq!(event.path.file_name(), path.file_name());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unread_events_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = DirectoryWatcher::watch(dir.path()).unwrap();
        for i in 0..WATCH_EVENT_CAPACITY {
            std::fs::write(dir.path().join(format!("{i}.pdf")), b"x").unwrap();
        }
        // several events per file, so the channel fills and stays full
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while watcher.events.len() < WATCH_EVENT_CAPACITY {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("channel fills");
        assert_eq!(watcher.events.len(), WATCH_EVENT_CAPACITY);

        // dropping with a full channel does not hang
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            tokio::task::spawn_blocking(move || drop(watcher)),
        )
        .await
        .expect("watcher released in time")
        .unwrap();
    }

    #[test]
    fn test_watch_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = DirectoryWatcher::watch(&missing).err().unwrap();
        assert!(matches!(err, Error::Watch(_)));
    }
}
