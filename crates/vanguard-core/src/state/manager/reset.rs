//! Wiping partitions back to their defaults

use super::{Lifecycle, StateManager};
use crate::error::{VanguardError, VanguardResult};
use crate::state::store::StateStore;
use futures::future::try_join_all;
use tracing::info;

impl StateManager {
    /// Delete every global setting and every secret, then reload.
    ///
    /// Pending writes are discarded and the worker is drained first so a late
    /// flush cannot resurrect a deleted key. The task history file is left alone.
    pub async fn reset_global_state(&self) -> VanguardResult<()> {
        self.reset_with("reset_global_state", |manager| async move {
            let storage = manager.storage();
            let (global, secrets) = tokio::try_join!(
                clear_store(storage.global_state.as_ref()),
                clear_store(storage.secrets.as_ref()),
            )?;
            info!(global, secrets, "Global state reset");
            Ok(())
        })
        .await
    }

    /// Delete every workspace setting, then reload
    pub async fn reset_workspace_state(&self) -> VanguardResult<()> {
        self.reset_with("reset_workspace_state", |manager| async move {
            let removed = clear_store(manager.storage().workspace_state.as_ref()).await?;
            info!(removed, "Workspace state reset");
            Ok(())
        })
        .await
    }

    async fn reset_with<'a, F, Fut>(&'a self, operation: &str, clear: F) -> VanguardResult<()>
    where
        F: FnOnce(&'a StateManager) -> Fut,
        Fut: std::future::Future<Output = VanguardResult<()>>,
    {
        if self.lifecycle() != Lifecycle::Ready {
            return Err(VanguardError::uninitialized(operation));
        }
        // A flush already running must land before the stores are cleared
        if let Some(session) = self.detach() {
            session.stopped().await;
        }
        self.begin_initialize(Lifecycle::Disposed)?;
        if let Err(e) = clear(self).await {
            // Reload whatever survived so the manager stays usable
            self.complete_initialize().await?;
            return Err(e);
        }
        self.complete_initialize().await
    }
}

async fn clear_store(store: &dyn StateStore) -> VanguardResult<usize> {
    let keys = store.list_keys().await?;
    try_join_all(keys.iter().map(|key| store.delete(key))).await?;
    Ok(keys.len())
}
