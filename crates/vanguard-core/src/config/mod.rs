//! Configuration management for Vanguard

mod env_loader;
mod file_loader;
mod logging_config;
mod model;

pub mod loader;

pub use env_loader::{ENV_PREFIX, apply_env, apply_env_with};
pub use loader::{ConfigLoader, ConfigSource, load_config};
pub use logging_config::LoggingConfig;
pub use model::{ProvidersConfig, StorageConfig, TtsConfig, VanguardConfig};
