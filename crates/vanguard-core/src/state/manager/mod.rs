//! Debounced multi-partition settings cache
//!
//! [`StateManager`] gives synchronous, immediately consistent reads and writes
//! over the global, secret and workspace partitions. Writes update the cache
//! at once and are persisted by a background worker after a quiet period, so
//! a burst of changes costs one flush. The task history file is watched and
//! external edits are folded back into the cache.
//!
//! # Lifecycle
//!
//! `Uninitialized → Initializing → Ready → Disposed`. Reads and writes are
//! only accepted while `Ready`; anything else is a caller bug and fails with
//! [`VanguardError::Uninitialized`].

mod api_config;
mod caches;
mod reset;
mod worker;

#[cfg(test)]
mod tests;

use self::caches::Caches;
use self::worker::{PersistenceWorker, Session};
use super::context::StorageContext;
use super::history::read_task_history;
use super::keys::{GlobalStateKey, LocalStateKey, SecretKey, StateKey};
use super::store::StateStore;
use crate::error::{VanguardError, VanguardResult};
use futures::future::try_join_all;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default quiet period before pending writes are flushed
pub const PERSISTENCE_DELAY: Duration = Duration::from_millis(500);

/// Default write-stability window for the history watcher
pub const HISTORY_STABILITY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

#[derive(Debug, Clone)]
pub struct StateManagerOptions {
    pub persistence_delay: Duration,
    /// `None` disables the history watcher
    pub history_stability: Option<Duration>,
}

impl Default for StateManagerOptions {
    fn default() -> Self {
        Self {
            persistence_delay: PERSISTENCE_DELAY,
            history_stability: Some(HISTORY_STABILITY),
        }
    }
}

/// Reported when a scheduled flush fails. The listed keys stay pending.
#[derive(Debug, Clone)]
pub struct PersistenceErrorEvent {
    pub error: VanguardError,
    pub keys: Vec<String>,
}

pub type PersistenceErrorHandler = Arc<dyn Fn(PersistenceErrorEvent) + Send + Sync>;
pub type ExternalChangeHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub(crate) struct Callbacks {
    on_persistence_error: RwLock<Option<PersistenceErrorHandler>>,
    on_sync_external_change: RwLock<Option<ExternalChangeHandler>>,
}

impl Callbacks {
    fn persistence_error(&self, event: PersistenceErrorEvent) {
        let handler = self.on_persistence_error.read().clone();
        match handler {
            Some(handler) => handler(event),
            None => warn!("Unhandled persistence error: {}", event.error),
        }
    }

    fn external_change(&self) {
        let handler = self.on_sync_external_change.read().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

struct Inner {
    lifecycle: Lifecycle,
    session: Option<Arc<Session>>,
}

pub struct StateManager {
    storage: StorageContext,
    options: StateManagerOptions,
    inner: Mutex<Inner>,
    callbacks: Arc<Callbacks>,
}

impl StateManager {
    pub fn new(storage: StorageContext) -> Self {
        Self::with_options(storage, StateManagerOptions::default())
    }

    pub fn with_options(storage: StorageContext, options: StateManagerOptions) -> Self {
        Self {
            storage,
            options,
            inner: Mutex::new(Inner {
                lifecycle: Lifecycle::Uninitialized,
                session: None,
            }),
            callbacks: Arc::new(Callbacks::default()),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().lifecycle
    }

    pub fn storage(&self) -> &StorageContext {
        &self.storage
    }

    /// Called when a scheduled flush fails
    pub fn on_persistence_error(
        &self,
        handler: impl Fn(PersistenceErrorEvent) + Send + Sync + 'static,
    ) {
        *self.callbacks.on_persistence_error.write() = Some(Arc::new(handler));
    }

    /// Called when the history file changed underneath the cache
    pub fn on_sync_external_change(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.callbacks.on_sync_external_change.write() = Some(Arc::new(handler));
    }

    /// Load all partitions, then start the persistence worker and watcher
    pub async fn initialize(&self) -> VanguardResult<()> {
        self.begin_initialize(Lifecycle::Uninitialized)?;
        self.complete_initialize().await
    }

    fn begin_initialize(&self, expected: Lifecycle) -> VanguardResult<()> {
        let mut inner = self.inner.lock();
        if inner.lifecycle != expected {
            return Err(VanguardError::other(format!(
                "Cannot initialize state manager from {:?}",
                inner.lifecycle
            )));
        }
        inner.lifecycle = Lifecycle::Initializing;
        Ok(())
    }

    async fn complete_initialize(&self) -> VanguardResult<()> {
        let loaded = tokio::try_join!(
            self.load_global(),
            load_secrets(self.storage.secrets.as_ref()),
            load_values(self.storage.workspace_state.as_ref(), LocalStateKey::ALL),
        );
        let (global, secrets, workspace) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Failed to initialize state manager: {}", e);
                self.inner.lock().lifecycle = Lifecycle::Uninitialized;
                return Err(e);
            }
        };
        debug!(
            global = global.len(),
            secrets = secrets.len(),
            workspace = workspace.len(),
            "State caches hydrated"
        );

        let session = PersistenceWorker::spawn(
            Caches::hydrated(global, secrets, workspace),
            self.storage.clone(),
            self.options.persistence_delay,
            self.options.history_stability,
            Arc::clone(&self.callbacks),
        );

        let mut inner = self.inner.lock();
        inner.session = Some(session);
        inner.lifecycle = Lifecycle::Ready;
        info!(dir = %self.storage.global_storage_dir.display(), "State manager ready");
        Ok(())
    }

    async fn load_global(&self) -> VanguardResult<HashMap<GlobalStateKey, Value>> {
        let keys: Vec<GlobalStateKey> = GlobalStateKey::ALL
            .iter()
            .copied()
            .filter(|key| *key != GlobalStateKey::TaskHistory)
            .collect();
        let history_path = self.storage.task_history_path();

        let (mut values, history) = tokio::try_join!(
            load_values(self.storage.global_state.as_ref(), &keys),
            async {
                let history = read_task_history(&history_path).await.unwrap_or_else(|e| {
                    warn!("Unreadable task history, starting empty: {}", e);
                    Value::Array(vec![])
                });
                Ok::<_, VanguardError>(history)
            },
        )?;
        values.insert(GlobalStateKey::TaskHistory, history);
        Ok(values)
    }

    /// Discard in-memory state, stop the worker and reload from storage.
    ///
    /// Unflushed writes are lost; an in-flight flush finishes on its own.
    pub async fn re_initialize(&self) -> VanguardResult<()> {
        if self.lifecycle() != Lifecycle::Ready {
            return Err(VanguardError::uninitialized("re_initialize"));
        }
        self.dispose();
        self.begin_initialize(Lifecycle::Disposed)?;
        info!("Re-initializing state manager");
        self.complete_initialize().await
    }

    /// Tear down without flushing. Pending writes are discarded.
    pub fn dispose(&self) {
        self.detach();
    }

    /// Mark the manager disposed and tell its worker to stop, handing back
    /// the session so the caller can wait for the worker to exit.
    fn detach(&self) -> Option<Arc<Session>> {
        let session = {
            let mut inner = self.inner.lock();
            inner.lifecycle = Lifecycle::Disposed;
            inner.session.take()
        };
        if let Some(session) = &session {
            let pending = session.caches.lock().pending.len();
            if pending > 0 {
                warn!(pending, "Disposing state manager with unflushed writes");
            }
            session.stop();
        }
        session
    }

    /// Flush pending writes, then dispose
    pub async fn shutdown(&self) -> VanguardResult<()> {
        if self.lifecycle() != Lifecycle::Ready {
            return Ok(());
        }
        let result = self.flush().await;
        self.dispose();
        result
    }

    /// Persist pending writes now instead of waiting for the deadline
    pub async fn flush(&self) -> VanguardResult<()> {
        let session = self.session("flush")?;
        session.flush_now().await
    }

    /// Number of keys not yet persisted
    pub fn pending_writes(&self) -> VanguardResult<usize> {
        let session = self.session("pending_writes")?;
        let pending = session.caches.lock().pending.len();
        Ok(pending)
    }

    fn session(&self, operation: &str) -> VanguardResult<Arc<Session>> {
        let inner = self.inner.lock();
        match (&inner.lifecycle, &inner.session) {
            (Lifecycle::Ready, Some(session)) => Ok(Arc::clone(session)),
            _ => Err(VanguardError::uninitialized(operation)),
        }
    }

    /// Apply `f` to the caches under one lock and schedule a flush
    fn mutate(&self, operation: &str, f: impl FnOnce(&mut Caches)) -> VanguardResult<()> {
        let session = self.session(operation)?;
        f(&mut session.caches.lock());
        session.schedule_flush();
        Ok(())
    }

    pub fn get_global(&self, key: GlobalStateKey) -> VanguardResult<Option<Value>> {
        let session = self.session("get_global")?;
        let value = session.caches.lock().global.get(&key).cloned();
        Ok(value)
    }

    /// Typed read; a cached value of the wrong shape is an error
    pub fn get_global_as<T: DeserializeOwned>(
        &self,
        key: GlobalStateKey,
    ) -> VanguardResult<Option<T>> {
        match self.get_global(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| VanguardError::json(e.to_string()).with_context(key.as_str())),
            None => Ok(None),
        }
    }

    pub fn get_secret(&self, key: SecretKey) -> VanguardResult<Option<String>> {
        let session = self.session("get_secret")?;
        let value = session.caches.lock().secrets.get(&key).cloned();
        Ok(value)
    }

    pub fn get_workspace(&self, key: LocalStateKey) -> VanguardResult<Option<Value>> {
        let session = self.session("get_workspace")?;
        let value = session.caches.lock().workspace.get(&key).cloned();
        Ok(value)
    }

    /// `Value::Null` deletes the key on the next flush
    pub fn set_global(&self, key: GlobalStateKey, value: Value) -> VanguardResult<()> {
        self.mutate("set_global", |caches| caches.put_global(key, value))
    }

    pub fn set_global_batch(
        &self,
        entries: impl IntoIterator<Item = (GlobalStateKey, Value)>,
    ) -> VanguardResult<()> {
        self.mutate("set_global_batch", |caches| {
            for (key, value) in entries {
                caches.put_global(key, value);
            }
        })
    }

    /// `None` or an empty value deletes the secret on the next flush
    pub fn set_secret(&self, key: SecretKey, value: Option<&str>) -> VanguardResult<()> {
        let value = value.map(str::to_string);
        self.mutate("set_secret", |caches| caches.put_secret(key, value))
    }

    pub fn set_secrets_batch(
        &self,
        entries: impl IntoIterator<Item = (SecretKey, Option<String>)>,
    ) -> VanguardResult<()> {
        self.mutate("set_secrets_batch", |caches| {
            for (key, value) in entries {
                caches.put_secret(key, value);
            }
        })
    }

    pub fn set_workspace(&self, key: LocalStateKey, value: Value) -> VanguardResult<()> {
        self.mutate("set_workspace", |caches| caches.put_workspace(key, value))
    }

    pub fn set_workspace_batch(
        &self,
        entries: impl IntoIterator<Item = (LocalStateKey, Value)>,
    ) -> VanguardResult<()> {
        self.mutate("set_workspace_batch", |caches| {
            for (key, value) in entries {
                caches.put_workspace(key, value);
            }
        })
    }
}

impl Drop for StateManager {
    fn drop(&mut self) {
        if let Some(session) = self.inner.get_mut().session.take() {
            session.stop();
        }
    }
}

/// Read `keys` concurrently, falling back to each key's default
async fn load_values<K: StateKey>(
    store: &dyn StateStore,
    keys: &[K],
) -> VanguardResult<HashMap<K, Value>> {
    let reads = keys.iter().map(|key| async move {
        let value = store.get(key.as_str()).await?;
        Ok::<_, VanguardError>((*key, value))
    });
    let loaded = try_join_all(reads)
        .await
        .map_err(|e| e.with_context(format!("loading {} partition", K::PARTITION)))?;

    Ok(loaded
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .filter(|v| !v.is_null())
                .or_else(|| key.default_value())
                .map(|v| (key, v))
        })
        .collect())
}

async fn load_secrets(store: &dyn StateStore) -> VanguardResult<HashMap<SecretKey, String>> {
    let values = load_values(store, SecretKey::ALL).await?;
    Ok(values
        .into_iter()
        .filter_map(|(key, value)| {
            let secret = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (!secret.is_empty()).then_some((key, secret))
        })
        .collect())
}
