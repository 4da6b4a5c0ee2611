//! Logging configuration

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub const LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    pub const FORMATS: &'static [&'static str] = &["pretty", "compact", "json"];

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
        assert!(!config.is_json());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format": "JSON"}"#).unwrap();
        assert_eq!(config.level, "info");
        assert!(config.is_json());
    }
}
