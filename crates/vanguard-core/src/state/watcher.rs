//! Debounced watcher for the task history file
//!
//! The watcher never touches the state cache itself. It forwards
//! [`HistoryFileEvent`]s to the persistence worker, which applies them
//! between flushes.

use crate::error::{VanguardError, VanguardResult};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// External modification of the history file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFileEvent {
    /// The file was created or written and exists now
    Changed,
    /// The file no longer exists
    Removed,
}

/// Watches one file through its parent directory.
///
/// Watching the directory instead of the file survives atomic
/// rename-over writes, which replace the inode.
pub struct HistoryWatcher {
    #[allow(dead_code)]
    debouncer: Debouncer<RecommendedWatcher>,
    path: PathBuf,
}

impl HistoryWatcher {
    /// Start watching `path`.
    ///
    /// `stability` is the quiet period a burst of writes must settle for
    /// before one event is emitted. The parent directory is created if
    /// needed; the file itself may not exist yet.
    pub fn start(
        path: &Path,
        stability: Duration,
        events: mpsc::UnboundedSender<HistoryFileEvent>,
    ) -> VanguardResult<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| VanguardError::watcher(format!("{} has no parent", path.display())))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| VanguardError::io_with_path(e.to_string(), parent.display().to_string()))?;

        let target = path.to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());

        let mut debouncer = new_debouncer(
            stability,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(batch) => {
                    let touched = batch.iter().any(|event| {
                        event.kind == DebouncedEventKind::Any
                            && event.path.file_name().map(|n| n.to_os_string()) == file_name
                    });
                    if !touched {
                        return;
                    }
                    let event = if target.exists() {
                        HistoryFileEvent::Changed
                    } else {
                        HistoryFileEvent::Removed
                    };
                    debug!(path = %target.display(), ?event, "Task history file event");
                    if events.send(event).is_err() {
                        debug!("History event receiver dropped");
                    }
                }
                Err(e) => error!("Task history watcher error: {}", e),
            },
        )
        .map_err(|e| VanguardError::watcher(format!("Failed to create file watcher: {}", e)))?;

        debouncer
            .watcher()
            .watch(parent, RecursiveMode::NonRecursive)
            .map_err(|e| {
                VanguardError::watcher(format!("Failed to watch {}: {}", parent.display(), e))
            })?;

        Ok(Self {
            debouncer,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for HistoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryWatcher")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_reports_change_and_removal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("taskHistory.json");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = HistoryWatcher::start(&path, Duration::from_millis(50), tx).unwrap();

        std::fs::write(&path, "[]").unwrap();
        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some(HistoryFileEvent::Changed));

        std::fs::remove_file(&path).unwrap();
        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some(HistoryFileEvent::Removed));
    }

    #[tokio::test]
    async fn test_ignores_sibling_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("taskHistory.json");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = HistoryWatcher::start(&path, Duration::from_millis(50), tx).unwrap();

        std::fs::write(dir.path().join("state").join("other.json"), "{}").unwrap();
        assert!(timeout(Duration::from_millis(400), rx.recv()).await.is_err());
    }
}
