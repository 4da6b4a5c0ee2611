//! Layered configuration loading

use super::env_loader::apply_env;
use super::file_loader::{load_from_file, merge_values};
use super::model::VanguardConfig;
use crate::error::{VanguardError, VanguardResult};
use std::path::{Path, PathBuf};

/// Source of configuration data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Configuration from a file; a missing file contributes nothing
    File(PathBuf),
    /// `VANGUARD_*` environment variables
    Environment,
    /// A `.env` file in the working directory or its parents
    DotEnv,
}

/// Configuration loader with support for multiple sources.
///
/// Sources apply in the order they were added, each overriding the fields
/// it sets; everything starts from [`VanguardConfig::default`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    pub fn with_dotenv(self) -> Self {
        self.add_source(ConfigSource::DotEnv)
    }

    /// Load configuration from all sources, then validate it
    pub fn load(self) -> VanguardResult<VanguardConfig> {
        let mut config = VanguardConfig::default();
        for source in &self.sources {
            config = self.apply_source(config, source)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_source(
        &self,
        mut config: VanguardConfig,
        source: &ConfigSource,
    ) -> VanguardResult<VanguardConfig> {
        match source {
            ConfigSource::File(path) => {
                tracing::debug!("Loading config from file: {}", path.display());
                let Some(overlay) = load_from_file(path)? else {
                    tracing::debug!("Config file {} not found, skipping", path.display());
                    return Ok(config);
                };
                let mut merged = serde_json::to_value(&config)?;
                merge_values(&mut merged, overlay);
                serde_json::from_value(merged).map_err(|e| {
                    VanguardError::config_with_context(
                        format!("Invalid configuration: {}", e),
                        format!("Applying configuration from '{}'", path.display()),
                    )
                })
            }
            ConfigSource::Environment => {
                tracing::debug!("Loading config from environment");
                apply_env(&mut config)?;
                Ok(config)
            }
            ConfigSource::DotEnv => {
                match dotenv::dotenv() {
                    Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
                    Err(e) => tracing::debug!("No .env file loaded: {}", e),
                }
                Ok(config)
            }
        }
    }
}

/// Defaults, then `path` (if any), then `.env` and `VANGUARD_*` variables
pub fn load_config(path: Option<&Path>) -> VanguardResult<VanguardConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.with_dotenv().with_env().load()
}
