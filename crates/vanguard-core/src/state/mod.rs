//! Persisted settings: key sets, stores and the debounced state manager

pub mod context;
pub mod history;
pub mod keys;
pub mod manager;
pub mod store;
pub mod watcher;

pub use context::StorageContext;
pub use history::{HistoryItem, TASK_HISTORY_FILE, parse_history_items};
pub use keys::{GlobalStateKey, LocalStateKey, SecretKey, StateKey};
pub use manager::{
    ExternalChangeHandler, HISTORY_STABILITY, Lifecycle, PERSISTENCE_DELAY, PersistenceErrorEvent,
    PersistenceErrorHandler, StateManager, StateManagerOptions,
};
pub use store::{JsonFileStore, MemoryStore, StateStore};
pub use watcher::{HistoryFileEvent, HistoryWatcher};
