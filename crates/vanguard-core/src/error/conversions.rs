//! From trait implementations for VanguardError conversions

use super::types::VanguardError;

impl From<std::io::Error> for VanguardError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for VanguardError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<reqwest::Error> for VanguardError {
    fn from(error: reqwest::Error) -> Self {
        let status_code = error.status().map(|s| s.as_u16());
        let url = error.url().map(|u| u.to_string());
        Self::Http {
            message: error.to_string(),
            url,
            status_code,
        }
    }
}

impl From<notify::Error> for VanguardError {
    fn from(error: notify::Error) -> Self {
        Self::watcher(error.to_string())
    }
}

impl From<toml::de::Error> for VanguardError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.to_string(), "TOML")
    }
}

impl From<serde_yaml::Error> for VanguardError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_with_context(error.to_string(), "YAML")
    }
}
