//! Storage layout shared by the state manager and its collaborators

use super::history::task_history_path;
use super::store::{JsonFileStore, MemoryStore, StateStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The three partition stores plus the directory holding file-backed state
#[derive(Clone)]
pub struct StorageContext {
    pub global_state: Arc<dyn StateStore>,
    pub secrets: Arc<dyn StateStore>,
    pub workspace_state: Arc<dyn StateStore>,
    pub global_storage_dir: PathBuf,
}

impl StorageContext {
    pub fn new(
        global_state: Arc<dyn StateStore>,
        secrets: Arc<dyn StateStore>,
        workspace_state: Arc<dyn StateStore>,
        global_storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            global_state,
            secrets,
            workspace_state,
            global_storage_dir: global_storage_dir.into(),
        }
    }

    /// JSON files under the given directories; secrets are owner-only
    pub fn on_disk(global_dir: &Path, workspace_dir: &Path) -> Self {
        Self::new(
            Arc::new(JsonFileStore::new(global_dir.join("globalState.json"))),
            Arc::new(JsonFileStore::new(global_dir.join("secrets.json")).owner_only()),
            Arc::new(JsonFileStore::new(
                workspace_dir.join("workspaceState.json"),
            )),
            global_dir,
        )
    }

    /// Volatile partitions; task history still lives under `global_dir`
    pub fn in_memory(global_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            global_dir,
        )
    }

    pub fn task_history_path(&self) -> PathBuf {
        task_history_path(&self.global_storage_dir)
    }
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("global_storage_dir", &self.global_storage_dir)
            .finish_non_exhaustive()
    }
}
