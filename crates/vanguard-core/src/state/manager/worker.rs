//! Debounced persistence worker
//!
//! One worker runs per initialized session. It owns the debounce deadline,
//! performs every flush, and applies history file events between flushes,
//! so an external change never lands in the middle of a batch.

use super::caches::{Caches, FlushBatch};
use super::{Callbacks, PersistenceErrorEvent};
use crate::error::{VanguardError, VanguardResult};
use crate::state::context::StorageContext;
use crate::state::history::{read_task_history, write_task_history};
use crate::state::keys::{GlobalStateKey, SecretKey, StateKey};
use crate::state::store::StateStore;
use crate::state::watcher::{HistoryFileEvent, HistoryWatcher};
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

pub(super) enum WorkerCommand {
    /// A write landed; replace the deadline
    Reschedule,
    /// Flush now and report the outcome
    FlushNow(oneshot::Sender<VanguardResult<()>>),
    Stop,
}

/// State shared between the manager and one worker
pub(super) struct Session {
    pub caches: Mutex<Caches>,
    commands: mpsc::UnboundedSender<WorkerCommand>,
    // Resolves once the worker loop has returned
    exited: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Session {
    pub fn schedule_flush(&self) {
        if self.commands.send(WorkerCommand::Reschedule).is_err() {
            warn!("Persistence worker stopped; write stays pending");
        }
    }

    pub async fn flush_now(&self) -> VanguardResult<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(WorkerCommand::FlushNow(tx))
            .map_err(|_| VanguardError::storage("Persistence worker stopped"))?;
        rx.await
            .map_err(|_| VanguardError::storage("Persistence worker stopped"))?
    }

    pub fn stop(&self) {
        let _ = self.commands.send(WorkerCommand::Stop);
    }

    /// Wait until the worker has exited, including any flush it was running
    pub async fn stopped(&self) {
        let exited = self.exited.lock().take();
        if let Some(exited) = exited {
            let _ = exited.await;
        }
    }
}

pub(super) struct PersistenceWorker {
    session: Arc<Session>,
    storage: StorageContext,
    history_path: PathBuf,
    delay: Duration,
    callbacks: Arc<Callbacks>,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    history_events: mpsc::UnboundedReceiver<HistoryFileEvent>,
    // Keeps the event channel open when no watcher could be started
    _history_tx: mpsc::UnboundedSender<HistoryFileEvent>,
    _watcher: Option<HistoryWatcher>,
    // Dropped when `run` returns
    _exit: oneshot::Sender<()>,
}

impl PersistenceWorker {
    /// Build a session around hydrated caches and spawn its worker
    pub fn spawn(
        caches: Caches,
        storage: StorageContext,
        delay: Duration,
        history_stability: Option<Duration>,
        callbacks: Arc<Callbacks>,
    ) -> Arc<Session> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (history_tx, history_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let history_path = storage.task_history_path();

        let watcher = history_stability.and_then(|stability| {
            match HistoryWatcher::start(&history_path, stability, history_tx.clone()) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    error!("Failed to set up task history watcher: {}", e);
                    None
                }
            }
        });

        let session = Arc::new(Session {
            caches: Mutex::new(caches),
            commands: command_tx,
            exited: Mutex::new(Some(exit_rx)),
        });

        let worker = Self {
            session: Arc::clone(&session),
            storage,
            history_path,
            delay,
            callbacks,
            commands: command_rx,
            history_events: history_rx,
            _history_tx: history_tx,
            _watcher: watcher,
            _exit: exit_tx,
        };
        tokio::spawn(worker.run());
        session
    }

    async fn run(mut self) {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(WorkerCommand::Reschedule) => {
                        deadline = Some(Instant::now() + self.delay);
                    }
                    Some(WorkerCommand::FlushNow(ack)) => {
                        deadline = None;
                        let result = self.flush().await;
                        if let Err(e) = &result {
                            error!("Failed to persist pending changes: {}", e);
                        }
                        let _ = ack.send(result);
                    }
                    Some(WorkerCommand::Stop) | None => break,
                },
                _ = wait_for(deadline) => {
                    deadline = None;
                    if let Err(error) = self.flush().await {
                        error!("Failed to persist pending changes: {}", error);
                        let keys = self.session.caches.lock().snapshot().key_names();
                        self.callbacks.persistence_error(PersistenceErrorEvent { error, keys });
                    }
                }
                Some(event) = self.history_events.recv() => {
                    self.apply_history_event(event).await;
                }
            }
        }
        debug!("Persistence worker stopped");
    }

    async fn flush(&self) -> VanguardResult<()> {
        let batch = self.session.caches.lock().snapshot();
        if batch.is_empty() {
            return Ok(());
        }
        debug!(
            global = batch.global.len(),
            secrets = batch.secrets.len(),
            workspace = batch.workspace.len(),
            "Flushing pending state"
        );

        let (global, secrets, workspace) = tokio::join!(
            self.flush_global(&batch),
            self.flush_secrets(&batch),
            flush_values(self.storage.workspace_state.as_ref(), &batch.workspace),
        );
        combine([global, secrets, workspace])?;

        self.session.caches.lock().acknowledge(&batch);
        info!(keys = batch.len(), "Persisted pending state");
        Ok(())
    }

    async fn flush_global(&self, batch: &FlushBatch) -> VanguardResult<()> {
        let (history, regular): (Vec<_>, Vec<_>) = batch
            .global
            .iter()
            .cloned()
            .partition(|(key, _, _)| *key == GlobalStateKey::TaskHistory);

        let history_write = async {
            match history.into_iter().next() {
                Some((_, _, value)) => {
                    let value = value.unwrap_or_else(|| Value::Array(vec![]));
                    write_task_history(&self.history_path, &value).await
                }
                None => Ok(()),
            }
        };
        let (history_result, regular_result) = tokio::join!(
            history_write,
            flush_values(self.storage.global_state.as_ref(), &regular)
        );
        history_result.and(regular_result)
    }

    async fn flush_secrets(&self, batch: &FlushBatch) -> VanguardResult<()> {
        let store = self.storage.secrets.as_ref();
        let writes = batch.secrets.iter().map(|(key, _, value)| async move {
            match value {
                Some(secret) => store.set(key.as_str(), Value::String(secret.clone())).await,
                None => store.delete(key.as_str()).await,
            }
        });
        first_failure(SecretKey::PARTITION, join_all(writes).await)
    }

    async fn apply_history_event(&self, event: HistoryFileEvent) {
        let on_disk = match event {
            HistoryFileEvent::Changed => match read_task_history(&self.history_path).await {
                Ok(history) => history,
                Err(e) => {
                    error!("Failed to reload task history on change: {}", e);
                    return;
                }
            },
            HistoryFileEvent::Removed => Value::Array(vec![]),
        };

        let changed = {
            let mut caches = self.session.caches.lock();
            let unchanged = event == HistoryFileEvent::Changed
                && caches.global.get(&GlobalStateKey::TaskHistory) == Some(&on_disk);
            if !unchanged {
                caches.global.insert(GlobalStateKey::TaskHistory, on_disk);
            }
            !unchanged
        };

        if changed {
            info!(?event, "Task history changed on disk");
            self.callbacks.external_change();
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// One store call per key, all in flight together
async fn flush_values<K: StateKey>(
    store: &dyn StateStore,
    entries: &[(K, u64, Option<Value>)],
) -> VanguardResult<()> {
    let writes = entries.iter().map(|(key, _, value)| async move {
        match value {
            Some(value) => store.set(key.as_str(), value.clone()).await,
            None => store.delete(key.as_str()).await,
        }
    });
    first_failure(K::PARTITION, join_all(writes).await)
}

fn first_failure(partition: &str, results: Vec<VanguardResult<()>>) -> VanguardResult<()> {
    let total = results.len();
    let mut failures = results.into_iter().filter_map(Result::err);
    let Some(first) = failures.next() else {
        return Ok(());
    };
    let failed = 1 + failures.count();
    if failed == 1 {
        return Err(first.with_context(format!("{} partition", partition)));
    }
    Err(VanguardError::storage_with_context(
        format!("{} of {} writes failed, first: {}", failed, total, first),
        format!("{} partition", partition),
    ))
}

fn combine(results: [VanguardResult<()>; 3]) -> VanguardResult<()> {
    let mut failures: Vec<VanguardError> = results.into_iter().filter_map(Result::err).collect();
    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0)),
        _ => Err(VanguardError::storage(
            failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )),
    }
}
