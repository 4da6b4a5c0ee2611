//! Application configuration model

use super::logging_config::LoggingConfig;
use crate::api::ProviderEndpoints;
use crate::error::{VanguardError, VanguardResult};
use crate::state::{StateManagerOptions, StorageContext};
use crate::tts::TtsOptions;
use crate::tts::types::{DEFAULT_BASE_URL, DEFAULT_MODEL_PATH, DEFAULT_VOICE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where settings live and how eagerly they are written back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Cross-workspace state, secrets and task history
    pub global_dir: Option<PathBuf>,
    /// Project-local state
    pub workspace_dir: Option<PathBuf>,
    pub persistence_delay_ms: u64,
    pub history_stability_ms: u64,
    pub watch_history: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            global_dir: None,
            workspace_dir: None,
            persistence_delay_ms: 500,
            history_stability_ms: 300,
            watch_history: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Used when the persisted `requestTimeoutMs` setting is unset
    pub request_timeout_ms: Option<u64>,
    pub endpoints: ProviderEndpoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub base_url: String,
    pub model_path: String,
    pub voice: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub request_timeout_ms: Option<u64>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            poll_interval_ms: 2_000,
            max_poll_attempts: 150,
            cache_capacity: 50,
            cache_ttl_secs: 24 * 60 * 60,
            request_timeout_ms: None,
        }
    }
}

impl TtsConfig {
    pub fn options(&self) -> TtsOptions {
        TtsOptions {
            base_url: self.base_url.clone(),
            model_path: self.model_path.clone(),
            voice: self.voice.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_attempts: self.max_poll_attempts,
            cache_capacity: self.cache_capacity,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Main configuration structure for Vanguard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VanguardConfig {
    pub storage: StorageConfig,
    pub providers: ProvidersConfig,
    pub tts: TtsConfig,
    pub logging: LoggingConfig,
}

impl VanguardConfig {
    /// Configured global dir, else `<data_dir>/vanguard`
    pub fn global_dir(&self) -> PathBuf {
        self.storage.global_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vanguard")
        })
    }

    /// Configured workspace dir, else `<cwd>/.vanguard`
    pub fn workspace_dir(&self) -> PathBuf {
        self.storage.workspace_dir.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".vanguard")
        })
    }

    pub fn storage_context(&self) -> StorageContext {
        StorageContext::on_disk(&self.global_dir(), &self.workspace_dir())
    }

    pub fn state_manager_options(&self) -> StateManagerOptions {
        StateManagerOptions {
            persistence_delay: Duration::from_millis(self.storage.persistence_delay_ms),
            history_stability: self
                .storage
                .watch_history
                .then(|| Duration::from_millis(self.storage.history_stability_ms)),
        }
    }

    /// Reject settings that would make the core misbehave
    pub fn validate(&self) -> VanguardResult<()> {
        if self.storage.persistence_delay_ms == 0 {
            return Err(VanguardError::config("storage.persistence_delay_ms must be greater than 0"));
        }
        if self.storage.watch_history && self.storage.history_stability_ms == 0 {
            return Err(VanguardError::config("storage.history_stability_ms must be greater than 0"));
        }
        if self.tts.cache_capacity == 0 {
            return Err(VanguardError::config("tts.cache_capacity must be greater than 0"));
        }
        if self.tts.cache_ttl_secs == 0 {
            return Err(VanguardError::config("tts.cache_ttl_secs must be greater than 0"));
        }
        if self.tts.max_poll_attempts == 0 || self.tts.poll_interval_ms == 0 {
            return Err(VanguardError::config("tts polling needs a non-zero interval and attempt count"));
        }
        if self.tts.base_url.trim().is_empty() {
            return Err(VanguardError::config("tts.base_url cannot be empty"));
        }
        if !LoggingConfig::LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(VanguardError::config_with_context(
                format!("Unknown log level: {}", self.logging.level),
                format!("expected one of {}", LoggingConfig::LEVELS.join(", ")),
            ));
        }
        if !LoggingConfig::FORMATS.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(VanguardError::config(format!(
                "Unknown log format: {}",
                self.logging.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VanguardConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.state_manager_options().persistence_delay,
            Duration::from_millis(500)
        );
        assert_eq!(config.tts.options().cache_capacity, 50);
        assert_eq!(config.tts.options().poll_interval, Duration::from_secs(2));
        assert!(config.global_dir().ends_with("vanguard"));
        assert!(config.workspace_dir().ends_with(".vanguard"));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = VanguardConfig::default();
        config.tts.cache_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = VanguardConfig::default();
        config.storage.persistence_delay_ms = 0;
        assert!(config.validate().is_err());

        let mut config = VanguardConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabling_the_watcher() {
        let mut config = VanguardConfig::default();
        config.storage.watch_history = false;
        config.storage.history_stability_ms = 0;
        config.validate().unwrap();
        assert!(config.state_manager_options().history_stability.is_none());
    }
}
