//! Settings written through the controller survive a restart on disk

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use vanguard_core::api::{ApiProvider, Mode};
use vanguard_core::config::VanguardConfig;
use vanguard_core::state::LocalStateKey;
use vanguard_core::{Controller, ControllerOptions, GlobalStateKey, SecretKey, StateManager};

fn config(dir: &TempDir) -> VanguardConfig {
    let mut config = VanguardConfig::default();
    config.storage.global_dir = Some(dir.path().join("global"));
    config.storage.workspace_dir = Some(dir.path().join("workspace"));
    config.storage.persistence_delay_ms = 20;
    config.storage.watch_history = false;
    config
}

async fn start(config: &VanguardConfig) -> Controller {
    let state = Arc::new(StateManager::with_options(
        config.storage_context(),
        config.state_manager_options(),
    ));
    state.initialize().await.unwrap();
    Controller::new(state, ControllerOptions::from_config(config)).unwrap()
}

#[tokio::test]
async fn test_settings_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let controller = start(&config).await;
    controller
        .state()
        .set_global(GlobalStateKey::PlanModeApiProvider, json!("anthropic"))
        .unwrap();
    controller
        .state()
        .set_workspace(LocalStateKey::LocalClineRulesToggles, json!({"rule.md": true}))
        .unwrap();
    controller.save_api_key("apiKey", "sk-ant-1").unwrap();
    controller.set_mode(Mode::Plan).unwrap();
    controller.state().shutdown().await.unwrap();

    let restarted = start(&config).await;
    assert_eq!(restarted.mode(), Mode::Plan);
    assert_eq!(restarted.api_handler().provider(), ApiProvider::Anthropic);
    assert_eq!(
        restarted.state().get_secret(SecretKey::ApiKey).unwrap(),
        Some("sk-ant-1".to_string())
    );
    assert_eq!(
        restarted.state().get_workspace(LocalStateKey::LocalClineRulesToggles).unwrap(),
        Some(json!({"rule.md": true}))
    );
    restarted.state().shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disposed_writes_are_lost() {
    let dir = TempDir::new().unwrap();
    let mut config = config(&dir);
    config.storage.persistence_delay_ms = 60_000;

    let controller = start(&config).await;
    controller
        .state()
        .set_global(GlobalStateKey::CustomPrompt, json!("be terse"))
        .unwrap();
    controller.state().dispose();

    let restarted = start(&config).await;
    assert_eq!(
        restarted.state().get_global(GlobalStateKey::CustomPrompt).unwrap(),
        None
    );
}

#[tokio::test]
async fn test_workspace_reset_leaves_global_settings() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let controller = start(&config).await;
    controller
        .state()
        .set_global(GlobalStateKey::PreferredLanguage, json!("German"))
        .unwrap();
    controller
        .state()
        .set_workspace(LocalStateKey::LocalClineRulesToggles, json!({"a": true}))
        .unwrap();
    controller.state().flush().await.unwrap();

    controller.reset_workspace_state().await.unwrap();
    controller.state().shutdown().await.unwrap();

    let restarted = start(&config).await;
    assert_eq!(
        restarted.state().get_global(GlobalStateKey::PreferredLanguage).unwrap(),
        Some(json!("German"))
    );
    // Hydration applies the partition default again
    assert_eq!(
        restarted.state().get_workspace(LocalStateKey::LocalClineRulesToggles).unwrap(),
        Some(json!({}))
    );
}
