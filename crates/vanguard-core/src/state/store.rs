//! Key-value persistence backends for one settings partition

use crate::error::{VanguardError, VanguardResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Durable storage for one partition.
///
/// No transactions and no range queries: callers issue one call per key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> VanguardResult<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> VanguardResult<()>;

    async fn delete(&self, key: &str) -> VanguardResult<()>;

    async fn list_keys(&self) -> VanguardResult<Vec<String>>;
}

/// Volatile store, used by tests and by `--ephemeral` CLI runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, e.g. to simulate existing on-disk state
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> VanguardResult<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> VanguardResult<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> VanguardResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> VanguardResult<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

/// One JSON object per partition file.
///
/// The file is loaded on first access and rewritten wholesale through a
/// temp file and rename on every mutation. Mutations are serialized by an
/// async mutex, so concurrent `set` calls from one flush cannot interleave.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    owner_only: bool,
    entries: tokio::sync::Mutex<Option<Map<String, Value>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner_only: false,
            entries: tokio::sync::Mutex::new(None),
        }
    }

    /// Restrict the file to its owner (mode 0600 on Unix). Used for secrets.
    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> VanguardResult<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => Ok(map),
                other => {
                    warn!(
                        path = %self.path.display(),
                        "State file does not hold a JSON object ({}), starting empty",
                        type_name(&other)
                    );
                    Ok(Map::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(VanguardError::io_with_path(
                e.to_string(),
                self.path.display().to_string(),
            )),
        }
    }

    async fn persist(&self, map: &Map<String, Value>) -> VanguardResult<()> {
        let content = serde_json::to_string_pretty(map)?;
        write_atomic(&self.path, content.as_bytes(), self.owner_only).await?;
        debug!(path = %self.path.display(), keys = map.len(), "State file written");
        Ok(())
    }

    async fn with_entries<R>(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> (R, bool),
    ) -> VanguardResult<R> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let Some(map) = guard.as_mut() else {
            return Err(VanguardError::storage("State file cache unavailable"));
        };
        let mut updated = map.clone();
        let (result, changed) = f(&mut updated);
        if changed {
            self.persist(&updated).await?;
            *map = updated;
        }
        Ok(result)
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, key: &str) -> VanguardResult<Option<Value>> {
        self.with_entries(|map| (map.get(key).cloned(), false)).await
    }

    async fn set(&self, key: &str, value: Value) -> VanguardResult<()> {
        self.with_entries(|map| {
            map.insert(key.to_string(), value);
            ((), true)
        })
        .await
    }

    async fn delete(&self, key: &str) -> VanguardResult<()> {
        self.with_entries(|map| {
            let removed = map.remove(key).is_some();
            ((), removed)
        })
        .await
    }

    async fn list_keys(&self) -> VanguardResult<Vec<String>> {
        self.with_entries(|map| (map.keys().cloned().collect(), false))
            .await
    }
}

/// Write `content` to `path` via a sibling temp file and rename
pub(crate) async fn write_atomic(
    path: &Path,
    content: &[u8],
    owner_only: bool,
) -> VanguardResult<()> {
    let io_err =
        |e: std::io::Error| VanguardError::io_with_path(e.to_string(), path.display().to_string());

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    // A stale temp file would keep its old permissions
    match tokio::fs::remove_file(&tmp).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(io_err(e)),
        _ => {}
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if owner_only {
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = owner_only;

    let mut file = options.open(&tmp).await.map_err(io_err)?;
    file.write_all(content).await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;
    drop(file);

    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_basic_ops() {
        let store = MemoryStore::new();
        assert_eq!(store.get("mode").await.unwrap(), None);

        store.set("mode", json!("plan")).await.unwrap();
        assert_eq!(store.get("mode").await.unwrap(), Some(json!("plan")));
        assert_eq!(store.list_keys().await.unwrap(), vec!["mode".to_string()]);

        store.delete("mode").await.unwrap();
        assert_eq!(store.get("mode").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("globalState.json");

        let store = JsonFileStore::new(&path);
        store.set("mode", json!("plan")).await.unwrap();
        store.set("isNewUser", json!(false)).await.unwrap();
        store.delete("isNewUser").await.unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("mode").await.unwrap(), Some(json!("plan")));
        assert_eq!(reopened.get("isNewUser").await.unwrap(), None);
        assert!(!dir.path().join("globalState.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope").join("state.json"));
        assert!(store.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get("apiKey").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        let store = JsonFileStore::new(&path).owner_only();
        store.set("apiKey", json!("sk-test")).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_ignores_stale_temp_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.json");
        let stale = dir.path().join("secrets.json.tmp");
        std::fs::write(&stale, "{}").unwrap();
        std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = JsonFileStore::new(&path).owner_only();
        store.set("apiKey", json!("sk-test")).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!stale.exists());
        assert_eq!(store.get("apiKey").await.unwrap(), Some(json!("sk-test")));
    }
}
