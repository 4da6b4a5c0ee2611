//! Task history records and the wholesale history file

use super::store::write_atomic;
use crate::error::{VanguardError, VanguardResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const TASK_HISTORY_FILE: &str = "taskHistory.json";

/// One task/session history entry.
///
/// Only the fields the core reads are typed; anything else the file holds
/// is preserved verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    #[serde(default)]
    pub ts: i64,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub tokens_in: u64,
    #[serde(default)]
    pub tokens_out: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_writes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_reads: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `<global storage>/state/taskHistory.json`
pub fn task_history_path(global_storage_dir: &Path) -> PathBuf {
    global_storage_dir.join("state").join(TASK_HISTORY_FILE)
}

/// Read the history file as raw JSON.
///
/// A missing or empty file yields an empty array. Content that is not an
/// array is an error so the caller can decide whether to keep its cache.
pub async fn read_task_history(path: &Path) -> VanguardResult<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Value::Array(vec![])),
        Err(e) => {
            return Err(VanguardError::io_with_path(
                e.to_string(),
                path.display().to_string(),
            ));
        }
    };
    if content.trim().is_empty() {
        return Ok(Value::Array(vec![]));
    }
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| VanguardError::json(e.to_string()).with_context(path.display().to_string()))?;
    if !value.is_array() {
        return Err(VanguardError::storage_with_context(
            "Task history is not a JSON array",
            path.display().to_string(),
        ));
    }
    Ok(value)
}

/// Replace the history file with `history`
pub async fn write_task_history(path: &Path, history: &Value) -> VanguardResult<()> {
    let content = serde_json::to_string(history)?;
    write_atomic(path, content.as_bytes(), false).await
}

/// Typed view over a cached history value; malformed entries are skipped
pub fn parse_history_items(history: &Value) -> Vec<HistoryItem> {
    let Some(entries) = history.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed history entry: {}", e);
                None
            }
        })
        .collect()
}
