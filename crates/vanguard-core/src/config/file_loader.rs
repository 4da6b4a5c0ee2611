//! File-based configuration loading

use crate::error::{VanguardError, VanguardResult};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a config file as a JSON value tree
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns `None` if the file doesn't exist.
pub fn load_from_file(path: &Path) -> VanguardResult<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| {
        VanguardError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let value: Value = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            VanguardError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            VanguardError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            VanguardError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(Some(value))
}

/// Overlay `overlay` onto `base`, recursing into objects
pub(super) fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_from_file(&temp_dir.path().join("nope.toml")).unwrap().is_none());
    }

    #[test]
    fn test_formats_by_extension() {
        let temp_dir = TempDir::new().unwrap();

        let toml_path = temp_dir.path().join("vanguard.toml");
        fs::write(&toml_path, "[tts]\nvoice = \"af_bella\"\n").unwrap();
        assert_eq!(load_from_file(&toml_path).unwrap().unwrap()["tts"]["voice"], "af_bella");

        let yaml_path = temp_dir.path().join("vanguard.yml");
        fs::write(&yaml_path, "logging:\n  level: debug\n").unwrap();
        assert_eq!(load_from_file(&yaml_path).unwrap().unwrap()["logging"]["level"], "debug");

        let json_path = temp_dir.path().join("vanguard.json");
        fs::write(&json_path, "{not json").unwrap();
        assert!(load_from_file(&json_path).is_err());
    }

    #[test]
    fn test_merge_is_deep() {
        let mut base = json!({"tts": {"voice": "af_heart", "cache_capacity": 50}, "logging": {"level": "info"}});
        merge_values(&mut base, json!({"tts": {"voice": "af_bella"}}));
        assert_eq!(
            base,
            json!({"tts": {"voice": "af_bella", "cache_capacity": 50}, "logging": {"level": "info"}})
        );
    }
}
