//! In-memory partition caches and their pending-write bookkeeping

use crate::state::keys::{GlobalStateKey, LocalStateKey, SecretKey};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Keys changed since the last successful flush.
///
/// Each entry carries the sequence number of its latest write, so a flush
/// that raced a newer write leaves that key pending.
#[derive(Debug, Default)]
pub(super) struct PendingWrites {
    pub global: BTreeMap<GlobalStateKey, u64>,
    pub secrets: BTreeMap<SecretKey, u64>,
    pub workspace: BTreeMap<LocalStateKey, u64>,
    next_seq: u64,
}

impl PendingWrites {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.secrets.len() + self.workspace.len()
    }
}

/// Values to persist, captured under the cache lock
#[derive(Debug, Default)]
pub(super) struct FlushBatch {
    pub global: Vec<(GlobalStateKey, u64, Option<Value>)>,
    pub secrets: Vec<(SecretKey, u64, Option<String>)>,
    pub workspace: Vec<(LocalStateKey, u64, Option<Value>)>,
}

impl FlushBatch {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.secrets.is_empty() && self.workspace.is_empty()
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.secrets.len() + self.workspace.len()
    }

    pub fn key_names(&self) -> Vec<String> {
        self.global
            .iter()
            .map(|(k, _, _)| k.as_str())
            .chain(self.secrets.iter().map(|(k, _, _)| k.as_str()))
            .chain(self.workspace.iter().map(|(k, _, _)| k.as_str()))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Default)]
pub(super) struct Caches {
    pub global: HashMap<GlobalStateKey, Value>,
    pub secrets: HashMap<SecretKey, String>,
    pub workspace: HashMap<LocalStateKey, Value>,
    pub pending: PendingWrites,
}

impl Caches {
    /// Hydrated caches; nothing is pending
    pub fn hydrated(
        global: HashMap<GlobalStateKey, Value>,
        secrets: HashMap<SecretKey, String>,
        workspace: HashMap<LocalStateKey, Value>,
    ) -> Self {
        Self {
            global,
            secrets,
            workspace,
            pending: PendingWrites::default(),
        }
    }

    /// `null` removes the key; task history is never absent, only empty
    pub fn put_global(&mut self, key: GlobalStateKey, value: Value) {
        match value {
            Value::Null if key == GlobalStateKey::TaskHistory => {
                self.global.insert(key, Value::Array(vec![]));
            }
            Value::Null => {
                self.global.remove(&key);
            }
            value => {
                self.global.insert(key, value);
            }
        }
        let seq = self.pending.next_seq();
        self.pending.global.insert(key, seq);
    }

    /// Absent or empty secrets are removed
    pub fn put_secret(&mut self, key: SecretKey, value: Option<String>) {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                self.secrets.insert(key, value);
            }
            None => {
                self.secrets.remove(&key);
            }
        }
        let seq = self.pending.next_seq();
        self.pending.secrets.insert(key, seq);
    }

    pub fn put_workspace(&mut self, key: LocalStateKey, value: Value) {
        if value.is_null() {
            self.workspace.remove(&key);
        } else {
            self.workspace.insert(key, value);
        }
        let seq = self.pending.next_seq();
        self.pending.workspace.insert(key, seq);
    }

    pub fn snapshot(&self) -> FlushBatch {
        FlushBatch {
            global: self
                .pending
                .global
                .iter()
                .map(|(key, seq)| (*key, *seq, self.global.get(key).cloned()))
                .collect(),
            secrets: self
                .pending
                .secrets
                .iter()
                .map(|(key, seq)| (*key, *seq, self.secrets.get(key).cloned()))
                .collect(),
            workspace: self
                .pending
                .workspace
                .iter()
                .map(|(key, seq)| (*key, *seq, self.workspace.get(key).cloned()))
                .collect(),
        }
    }

    /// Drop pending entries the batch persisted, unless rewritten since
    pub fn acknowledge(&mut self, batch: &FlushBatch) {
        for (key, seq, _) in &batch.global {
            if self.pending.global.get(key) == Some(seq) {
                self.pending.global.remove(key);
            }
        }
        for (key, seq, _) in &batch.secrets {
            if self.pending.secrets.get(key) == Some(seq) {
                self.pending.secrets.remove(key);
            }
        }
        for (key, seq, _) in &batch.workspace {
            if self.pending.workspace.get(key) == Some(seq) {
                self.pending.workspace.remove(key);
            }
        }
    }
}
