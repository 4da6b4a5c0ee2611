//! Environment variable-based configuration overrides

use super::model::VanguardConfig;
use crate::error::{VanguardError, VanguardResult};
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "VANGUARD_";

/// Apply `VANGUARD_*` variables from the process environment
pub fn apply_env(config: &mut VanguardConfig) -> VanguardResult<()> {
    apply_env_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup`, which receives full variable names
pub fn apply_env_with<F>(config: &mut VanguardConfig, lookup: F) -> VanguardResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        lookup(&format!("{}{}", ENV_PREFIX, suffix)).filter(|value| !value.trim().is_empty())
    };

    if let Some(dir) = var("GLOBAL_DIR") {
        config.storage.global_dir = Some(PathBuf::from(dir));
    }
    if let Some(dir) = var("WORKSPACE_DIR") {
        config.storage.workspace_dir = Some(PathBuf::from(dir));
    }
    if let Some(value) = var("PERSISTENCE_DELAY_MS") {
        config.storage.persistence_delay_ms = parse("PERSISTENCE_DELAY_MS", &value)?;
    }
    if let Some(value) = var("HISTORY_STABILITY_MS") {
        config.storage.history_stability_ms = parse("HISTORY_STABILITY_MS", &value)?;
    }
    if let Some(value) = var("WATCH_HISTORY") {
        config.storage.watch_history = parse("WATCH_HISTORY", &value)?;
    }

    if let Some(value) = var("REQUEST_TIMEOUT_MS") {
        config.providers.request_timeout_ms = Some(parse("REQUEST_TIMEOUT_MS", &value)?);
    }
    let endpoints = &mut config.providers.endpoints;
    for (suffix, slot) in [
        ("CLINE_BASE_URL", &mut endpoints.cline),
        ("ANTHROPIC_BASE_URL", &mut endpoints.anthropic),
        ("GROQ_BASE_URL", &mut endpoints.groq),
        ("XAI_BASE_URL", &mut endpoints.xai),
    ] {
        if let Some(url) = var(suffix) {
            *slot = Some(url);
        }
    }

    if let Some(url) = var("TTS_BASE_URL") {
        config.tts.base_url = url;
    }
    if let Some(voice) = var("TTS_VOICE") {
        config.tts.voice = voice;
    }
    if let Some(value) = var("TTS_CACHE_CAPACITY") {
        config.tts.cache_capacity = parse("TTS_CACHE_CAPACITY", &value)?;
    }

    if let Some(level) = var("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = var("LOG_FORMAT") {
        config.logging.format = format;
    }
    Ok(())
}

fn parse<T: FromStr>(suffix: &str, value: &str) -> VanguardResult<T> {
    value.trim().parse().map_err(|_| {
        VanguardError::config(format!("Invalid {}{} value: {}", ENV_PREFIX, suffix, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn apply(vars: &[(&str, &str)]) -> VanguardResult<VanguardConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = VanguardConfig::default();
        apply_env_with(&mut config, |name| vars.get(name).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_overrides() {
        let config = apply(&[
            ("VANGUARD_GLOBAL_DIR", "/tmp/vg"),
            ("VANGUARD_PERSISTENCE_DELAY_MS", "250"),
            ("VANGUARD_GROQ_BASE_URL", "http://localhost:9000"),
            ("VANGUARD_LOG_FORMAT", "json"),
            ("VANGUARD_WATCH_HISTORY", "false"),
        ])
        .unwrap();

        assert_eq!(config.storage.global_dir, Some(PathBuf::from("/tmp/vg")));
        assert_eq!(config.storage.persistence_delay_ms, 250);
        assert_eq!(
            config.providers.endpoints.groq.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(config.logging.is_json());
        assert!(!config.storage.watch_history);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = apply(&[("VANGUARD_TTS_VOICE", "  ")]).unwrap();
        assert_eq!(config.tts.voice, "af_heart");
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = apply(&[("VANGUARD_TTS_CACHE_CAPACITY", "lots")]).unwrap_err();
        assert!(err.to_string().contains("VANGUARD_TTS_CACHE_CAPACITY"));
    }
}
