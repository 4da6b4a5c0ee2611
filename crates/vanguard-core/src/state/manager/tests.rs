use super::*;
use crate::api::{ApiProvider, Mode};
use crate::state::history::write_task_history;
use crate::state::store::{MemoryStore, MockStateStore};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

/// Memory store that records every write and can be told to fail
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<(String, Option<Value>)>>,
    fail: AtomicBool,
    set_delay: Option<Duration>,
}

impl RecordingStore {
    fn slow(delay: Duration) -> Self {
        Self {
            set_delay: Some(delay),
            ..Self::default()
        }
    }

    fn writes(&self) -> Vec<(String, Option<Value>)> {
        self.writes.lock().clone()
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> VanguardResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(VanguardError::storage("disk full"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StateStore for RecordingStore {
    async fn get(&self, key: &str) -> VanguardResult<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> VanguardResult<()> {
        if let Some(delay) = self.set_delay {
            sleep(delay).await;
        }
        self.check()?;
        self.writes.lock().push((key.to_string(), Some(value.clone())));
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> VanguardResult<()> {
        self.check()?;
        self.writes.lock().push((key.to_string(), None));
        self.inner.delete(key).await
    }

    async fn list_keys(&self) -> VanguardResult<Vec<String>> {
        self.inner.list_keys().await
    }
}

struct Fixture {
    dir: TempDir,
    global: Arc<RecordingStore>,
    secrets: Arc<RecordingStore>,
    workspace: Arc<RecordingStore>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_global(RecordingStore::default())
    }

    fn with_global(global: RecordingStore) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            global: Arc::new(global),
            secrets: Arc::new(RecordingStore::default()),
            workspace: Arc::new(RecordingStore::default()),
        }
    }

    fn storage(&self) -> StorageContext {
        StorageContext::new(
            self.global.clone(),
            self.secrets.clone(),
            self.workspace.clone(),
            self.dir.path(),
        )
    }

    fn manager(&self, delay: Duration) -> StateManager {
        StateManager::with_options(
            self.storage(),
            StateManagerOptions {
                persistence_delay: delay,
                history_stability: None,
            },
        )
    }

    async fn ready(&self, delay: Duration) -> StateManager {
        let manager = self.manager(delay);
        manager.initialize().await.unwrap();
        manager
    }
}

#[tokio::test]
async fn test_access_before_initialize_fails() {
    let fixture = Fixture::new();
    let manager = fixture.manager(PERSISTENCE_DELAY);

    let err = manager.get_global(GlobalStateKey::Mode).unwrap_err();
    assert!(matches!(err, VanguardError::Uninitialized { .. }));
    assert!(
        manager
            .set_secret(SecretKey::ApiKey, Some("sk-1"))
            .is_err()
    );
    assert!(manager.flush().await.is_err());
    assert_eq!(manager.lifecycle(), Lifecycle::Uninitialized);
}

#[tokio::test]
async fn test_initialize_twice_fails() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;
    assert!(manager.initialize().await.is_err());
    assert_eq!(manager.lifecycle(), Lifecycle::Ready);
}

#[tokio::test]
async fn test_hydration_applies_defaults() {
    let fixture = Fixture::new();
    fixture
        .global
        .inner
        .set("preferredLanguage", json!("German"))
        .await
        .unwrap();
    fixture
        .secrets
        .inner
        .set("groqApiKey", json!("gsk-1"))
        .await
        .unwrap();

    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    assert_eq!(
        manager.get_global(GlobalStateKey::PreferredLanguage).unwrap(),
        Some(json!("German"))
    );
    assert_eq!(
        manager.get_global(GlobalStateKey::Mode).unwrap(),
        Some(json!("act"))
    );
    assert_eq!(
        manager.get_global(GlobalStateKey::TaskHistory).unwrap(),
        Some(json!([]))
    );
    assert_eq!(
        manager.get_workspace(LocalStateKey::LocalClineRulesToggles).unwrap(),
        Some(json!({}))
    );
    assert_eq!(
        manager.get_secret(SecretKey::GroqApiKey).unwrap(),
        Some("gsk-1".to_string())
    );
    assert_eq!(manager.get_secret(SecretKey::ApiKey).unwrap(), None);
    assert_eq!(manager.pending_writes().unwrap(), 0);
}

#[tokio::test]
async fn test_reads_see_writes_immediately() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    manager
        .set_global(GlobalStateKey::Mode, json!("plan"))
        .unwrap();
    manager
        .set_secret(SecretKey::XaiApiKey, Some("xai-1"))
        .unwrap();
    manager
        .set_workspace(LocalStateKey::WorkflowToggles, json!({"a": true}))
        .unwrap();

    assert_eq!(
        manager.get_global_as::<String>(GlobalStateKey::Mode).unwrap(),
        Some("plan".to_string())
    );
    assert_eq!(
        manager.get_secret(SecretKey::XaiApiKey).unwrap(),
        Some("xai-1".to_string())
    );
    assert_eq!(
        manager.get_workspace(LocalStateKey::WorkflowToggles).unwrap(),
        Some(json!({"a": true}))
    );
    assert!(fixture.global.writes().is_empty());
    assert_eq!(manager.pending_writes().unwrap(), 3);
}

#[tokio::test]
async fn test_bursts_coalesce_into_one_write() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    manager
        .set_global(GlobalStateKey::PreferredLanguage, json!("French"))
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    manager
        .set_global(GlobalStateKey::PreferredLanguage, json!("Spanish"))
        .unwrap();

    sleep(Duration::from_millis(450)).await;
    assert!(fixture.global.writes().is_empty());

    sleep(Duration::from_millis(250)).await;
    assert_eq!(
        fixture.global.writes(),
        vec![("preferredLanguage".to_string(), Some(json!("Spanish")))]
    );
    assert_eq!(manager.pending_writes().unwrap(), 0);
}

#[tokio::test]
async fn test_failed_flush_keeps_writes_pending() {
    let fixture = Fixture::new();
    let manager = fixture.ready(Duration::from_millis(20)).await;

    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);
    manager.on_persistence_error(move |event| sink.lock().push(event.keys));

    fixture.global.set_failing(true);
    manager
        .set_global(GlobalStateKey::TelemetrySetting, json!("disabled"))
        .unwrap();
    sleep(Duration::from_millis(200)).await;

    assert_eq!(
        reported.lock().clone(),
        vec![vec!["telemetrySetting".to_string()]]
    );
    assert_eq!(manager.pending_writes().unwrap(), 1);
    assert_eq!(
        manager.get_global(GlobalStateKey::TelemetrySetting).unwrap(),
        Some(json!("disabled"))
    );

    fixture.global.set_failing(false);
    manager.flush().await.unwrap();
    assert_eq!(manager.pending_writes().unwrap(), 0);
    assert_eq!(
        fixture.global.inner.snapshot().get("telemetrySetting"),
        Some(&json!("disabled"))
    );
}

#[tokio::test]
async fn test_manual_flush_reports_failure() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    fixture.secrets.set_failing(true);
    manager
        .set_secret(SecretKey::ApiKey, Some("sk-1"))
        .unwrap();
    assert!(manager.flush().await.is_err());
    assert_eq!(manager.pending_writes().unwrap(), 1);
}

#[tokio::test]
async fn test_empty_secret_deletes() {
    let fixture = Fixture::new();
    fixture
        .secrets
        .inner
        .set("apiKey", json!("sk-old"))
        .await
        .unwrap();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    manager.set_secret(SecretKey::ApiKey, Some("")).unwrap();
    assert_eq!(manager.get_secret(SecretKey::ApiKey).unwrap(), None);

    manager.flush().await.unwrap();
    assert_eq!(
        fixture.secrets.writes(),
        vec![("apiKey".to_string(), None)]
    );
    assert!(fixture.secrets.inner.snapshot().is_empty());
}

#[tokio::test]
async fn test_null_global_deletes_without_set() {
    let dir = TempDir::new().unwrap();
    let mut global = MockStateStore::new();
    global.expect_get().returning(|_| Ok(None));
    global.expect_set().never();
    global
        .expect_delete()
        .withf(|key| key.to_string() == "anthropicBaseUrl")
        .times(1)
        .returning(|_| Ok(()));

    let storage = StorageContext::new(
        Arc::new(global),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
        dir.path(),
    );
    let manager = StateManager::with_options(
        storage,
        StateManagerOptions {
            persistence_delay: PERSISTENCE_DELAY,
            history_stability: None,
        },
    );
    manager.initialize().await.unwrap();

    manager
        .set_global(GlobalStateKey::AnthropicBaseUrl, Value::Null)
        .unwrap();
    assert_eq!(
        manager.get_global(GlobalStateKey::AnthropicBaseUrl).unwrap(),
        None
    );
    manager.flush().await.unwrap();
}

#[tokio::test]
async fn test_task_history_goes_to_file() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    let history = json!([{"id": "t1", "ts": 1, "task": "hello"}]);
    manager
        .set_global(GlobalStateKey::TaskHistory, history.clone())
        .unwrap();
    manager.flush().await.unwrap();

    assert!(fixture.global.writes().is_empty());
    let on_disk = read_task_history(&fixture.storage().task_history_path())
        .await
        .unwrap();
    assert_eq!(on_disk, history);
}

#[tokio::test]
async fn test_task_history_reloads_unchanged() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    let history = json!([
        {"id": "t1", "ts": 1, "task": "hello", "isFavorited": true},
        {"id": "t2", "ts": 2, "task": "refactor", "tokensIn": 120, "totalCost": 0.03}
    ]);
    manager
        .set_global(GlobalStateKey::TaskHistory, history.clone())
        .unwrap();
    manager.flush().await.unwrap();

    manager.re_initialize().await.unwrap();
    assert_eq!(
        manager.get_global(GlobalStateKey::TaskHistory).unwrap(),
        Some(history)
    );
}

#[tokio::test]
async fn test_write_during_flush_stays_pending() {
    let fixture = Fixture::with_global(RecordingStore::slow(Duration::from_millis(150)));
    let manager = Arc::new(fixture.ready(Duration::from_secs(60)).await);

    manager
        .set_global(GlobalStateKey::PreferredLanguage, json!("Italian"))
        .unwrap();
    let flushing = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.flush().await })
    };
    sleep(Duration::from_millis(50)).await;
    manager
        .set_global(GlobalStateKey::PreferredLanguage, json!("Dutch"))
        .unwrap();

    flushing.await.unwrap().unwrap();
    assert_eq!(manager.pending_writes().unwrap(), 1);
    assert_eq!(
        manager.get_global(GlobalStateKey::PreferredLanguage).unwrap(),
        Some(json!("Dutch"))
    );

    manager.flush().await.unwrap();
    assert_eq!(
        fixture.global.inner.snapshot().get("preferredLanguage"),
        Some(&json!("Dutch"))
    );
}

#[tokio::test]
async fn test_external_history_change_syncs_cache() {
    let fixture = Fixture::new();
    let manager = StateManager::with_options(
        fixture.storage(),
        StateManagerOptions {
            persistence_delay: PERSISTENCE_DELAY,
            history_stability: Some(Duration::from_millis(50)),
        },
    );
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    manager.on_sync_external_change(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    manager.initialize().await.unwrap();

    let external = json!([{"id": "ext", "ts": 2, "task": "from another window"}]);
    write_task_history(&fixture.storage().task_history_path(), &external)
        .await
        .unwrap();

    timeout(Duration::from_secs(5), async {
        while manager.get_global(GlobalStateKey::TaskHistory).unwrap() != Some(external.clone()) {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(manager.pending_writes().unwrap(), 0);
}

#[tokio::test]
async fn test_history_removal_empties_cache() {
    let fixture = Fixture::new();
    let path = fixture.storage().task_history_path();
    write_task_history(&path, &json!([{"id": "t1", "ts": 1, "task": "x"}]))
        .await
        .unwrap();

    let manager = StateManager::with_options(
        fixture.storage(),
        StateManagerOptions {
            persistence_delay: PERSISTENCE_DELAY,
            history_stability: Some(Duration::from_millis(50)),
        },
    );
    manager.initialize().await.unwrap();
    assert_eq!(
        manager.get_global(GlobalStateKey::TaskHistory).unwrap(),
        Some(json!([{"id": "t1", "ts": 1, "task": "x"}]))
    );

    std::fs::remove_file(&path).unwrap();
    timeout(Duration::from_secs(5), async {
        while manager.get_global(GlobalStateKey::TaskHistory).unwrap() != Some(json!([])) {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_re_initialize_drops_unflushed_writes() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    manager
        .set_global(GlobalStateKey::Mode, json!("plan"))
        .unwrap();
    manager.flush().await.unwrap();
    manager
        .set_global(GlobalStateKey::PreferredLanguage, json!("Korean"))
        .unwrap();

    manager.re_initialize().await.unwrap();
    assert_eq!(manager.lifecycle(), Lifecycle::Ready);
    assert_eq!(
        manager.get_global(GlobalStateKey::Mode).unwrap(),
        Some(json!("plan"))
    );
    assert_eq!(
        manager.get_global(GlobalStateKey::PreferredLanguage).unwrap(),
        Some(json!("English"))
    );
    assert_eq!(manager.pending_writes().unwrap(), 0);
}

#[tokio::test]
async fn test_dispose_discards_and_shutdown_flushes() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;
    manager
        .set_global(GlobalStateKey::IsNewUser, json!(false))
        .unwrap();
    manager.dispose();
    assert_eq!(manager.lifecycle(), Lifecycle::Disposed);
    assert!(manager.get_global(GlobalStateKey::IsNewUser).is_err());
    assert!(fixture.global.writes().is_empty());

    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;
    manager
        .set_global(GlobalStateKey::IsNewUser, json!(false))
        .unwrap();
    manager.shutdown().await.unwrap();
    assert_eq!(manager.lifecycle(), Lifecycle::Disposed);
    assert_eq!(
        fixture.global.writes(),
        vec![("isNewUser".to_string(), Some(json!(false)))]
    );
}

#[tokio::test]
async fn test_api_configuration_round_trip() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;

    let mut config = manager.get_api_configuration().unwrap();
    assert_eq!(config.provider_for(Mode::Act), ApiProvider::Cline);

    config.groq_api_key = Some("gsk-1".to_string());
    config.plan_mode.api_provider = Some("groq".to_string());
    config.plan_mode.groq_model_id = Some("openai/gpt-oss-120b".to_string());
    config.act_mode.thinking_budget_tokens = Some(2048);
    manager.set_api_configuration(&config).unwrap();

    let reloaded = manager.get_api_configuration().unwrap();
    assert_eq!(reloaded, config);
    assert_eq!(
        manager.get_global(GlobalStateKey::PlanModeApiProvider).unwrap(),
        Some(json!("groq"))
    );

    config.groq_api_key = None;
    manager.set_api_configuration(&config).unwrap();
    assert_eq!(manager.get_secret(SecretKey::GroqApiKey).unwrap(), None);
}

#[tokio::test]
async fn test_reset_global_state_wipes_store_and_pending() {
    let fixture = Fixture::new();
    let manager = fixture.ready(Duration::from_millis(50)).await;
    manager
        .set_global(GlobalStateKey::PreferredLanguage, json!("German"))
        .unwrap();
    manager.set_secret(SecretKey::XaiApiKey, Some("xai-1")).unwrap();
    manager.flush().await.unwrap();

    manager
        .set_global(GlobalStateKey::CustomPrompt, json!("unflushed"))
        .unwrap();
    manager.reset_global_state().await.unwrap();

    assert_eq!(manager.lifecycle(), Lifecycle::Ready);
    assert_eq!(
        manager.get_global(GlobalStateKey::PreferredLanguage).unwrap(),
        Some(json!("English"))
    );
    assert_eq!(manager.get_secret(SecretKey::XaiApiKey).unwrap(), None);
    assert_eq!(manager.get_global(GlobalStateKey::CustomPrompt).unwrap(), None);

    sleep(Duration::from_millis(120)).await;
    assert!(fixture.global.inner.list_keys().await.unwrap().is_empty());
    assert!(fixture.secrets.inner.list_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_waits_for_running_flush() {
    let fixture = Fixture::with_global(RecordingStore::slow(Duration::from_millis(200)));
    let manager = fixture.ready(Duration::from_millis(10)).await;

    manager
        .set_global(GlobalStateKey::CustomPrompt, json!("secret sauce"))
        .unwrap();
    // Deadline has passed and the slow write is underway
    sleep(Duration::from_millis(50)).await;
    manager.reset_global_state().await.unwrap();
    assert_eq!(manager.get_global(GlobalStateKey::CustomPrompt).unwrap(), None);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(fixture.global.inner.snapshot().get("customPrompt"), None);

    manager.re_initialize().await.unwrap();
    assert_eq!(manager.get_global(GlobalStateKey::CustomPrompt).unwrap(), None);
}

#[tokio::test]
async fn test_reset_workspace_state_keeps_global() {
    let fixture = Fixture::new();
    let manager = fixture.ready(PERSISTENCE_DELAY).await;
    manager
        .set_workspace(LocalStateKey::WorkflowToggles, json!({"deploy.md": true}))
        .unwrap();
    manager.set_global(GlobalStateKey::Mode, json!("plan")).unwrap();
    manager.flush().await.unwrap();

    manager.reset_workspace_state().await.unwrap();
    assert_eq!(
        manager.get_workspace(LocalStateKey::WorkflowToggles).unwrap(),
        Some(json!({}))
    );
    assert_eq!(
        manager.get_global(GlobalStateKey::Mode).unwrap(),
        Some(json!("plan"))
    );

    manager.dispose();
    assert!(manager.reset_workspace_state().await.is_err());
}
