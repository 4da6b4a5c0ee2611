//! Wiring of configuration, state manager and controller for one CLI run

use crate::args::Cli;
use crate::console::CliConsole;
use std::sync::Arc;
use tempfile::TempDir;
use vanguard_core::config::VanguardConfig;
use vanguard_core::state::StateManager;
use vanguard_core::{Controller, ControllerOptions, ResultExt, StorageContext, VanguardResult};

/// Everything a command needs, torn down by [`App::shutdown`]
pub struct App {
    pub config: VanguardConfig,
    pub controller: Controller,
    pub console: CliConsole,
    // Holds the history directory of an ephemeral run alive
    _scratch: Option<TempDir>,
}

impl App {
    pub async fn start(cli: &Cli, config: VanguardConfig) -> VanguardResult<Self> {
        let console = CliConsole::new(cli.verbose);

        let (storage, scratch) = if cli.ephemeral {
            let scratch = TempDir::new().context("Creating ephemeral storage")?;
            (StorageContext::in_memory(scratch.path()), Some(scratch))
        } else {
            (config.storage_context(), None)
        };
        console.detail(&format!(
            "Global storage: {}",
            storage.global_storage_dir.display()
        ));

        let state = Arc::new(StateManager::with_options(
            storage,
            config.state_manager_options(),
        ));
        state.on_persistence_error(|event| {
            tracing::error!(keys = ?event.keys, "Failed to persist settings: {}", event.error);
        });
        state.initialize().await?;

        let controller = Controller::new(state, ControllerOptions::from_config(&config))?;
        Ok(Self {
            config,
            controller,
            console,
            _scratch: scratch,
        })
    }

    pub fn state(&self) -> &Arc<StateManager> {
        self.controller.state()
    }

    /// Flush pending writes and stop background tasks
    pub async fn shutdown(self) -> VanguardResult<()> {
        self.controller.state().shutdown().await
    }
}
