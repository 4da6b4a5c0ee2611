//! [`ApiConfiguration`] projection over global and secret keys

use super::StateManager;
use super::caches::Caches;
use crate::api::{ApiConfiguration, Mode, ModeApiSettings};
use crate::error::VanguardResult;
use crate::state::keys::{GlobalStateKey, SecretKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

impl StateManager {
    /// Assemble the provider configuration from the caches
    pub fn get_api_configuration(&self) -> VanguardResult<ApiConfiguration> {
        let session = self.session("get_api_configuration")?;
        let caches = session.caches.lock();
        let global = &caches.global;
        let secret = |key: SecretKey| caches.secrets.get(&key).cloned();

        Ok(ApiConfiguration {
            cline_account_id: secret(SecretKey::ClineAccountId),
            anthropic_api_key: secret(SecretKey::ApiKey),
            groq_api_key: secret(SecretKey::GroqApiKey),
            xai_api_key: secret(SecretKey::XaiApiKey),
            anthropic_base_url: read(global, GlobalStateKey::AnthropicBaseUrl),
            open_router_provider_sorting: read(global, GlobalStateKey::OpenRouterProviderSorting),
            request_timeout_ms: read(global, GlobalStateKey::RequestTimeoutMs),
            favorited_model_ids: read(global, GlobalStateKey::FavoritedModelIds),
            plan_mode: read_mode(global, Mode::Plan),
            act_mode: read_mode(global, Mode::Act),
        })
    }

    /// Write every field of `config` back: one global batch and one secrets
    /// batch, under a single lock. `None` fields delete their keys.
    pub fn set_api_configuration(&self, config: &ApiConfiguration) -> VanguardResult<()> {
        let mut global = vec![
            (
                GlobalStateKey::AnthropicBaseUrl,
                to_value(&config.anthropic_base_url),
            ),
            (
                GlobalStateKey::OpenRouterProviderSorting,
                to_value(&config.open_router_provider_sorting),
            ),
            (
                GlobalStateKey::RequestTimeoutMs,
                to_value(&config.request_timeout_ms),
            ),
            (
                GlobalStateKey::FavoritedModelIds,
                to_value(&config.favorited_model_ids),
            ),
        ];
        global.extend(mode_entries(Mode::Plan, &config.plan_mode));
        global.extend(mode_entries(Mode::Act, &config.act_mode));

        let secrets = [
            (SecretKey::ClineAccountId, config.cline_account_id.clone()),
            (SecretKey::ApiKey, config.anthropic_api_key.clone()),
            (SecretKey::GroqApiKey, config.groq_api_key.clone()),
            (SecretKey::XaiApiKey, config.xai_api_key.clone()),
        ];

        self.mutate("set_api_configuration", |caches: &mut Caches| {
            for (key, value) in global {
                caches.put_global(key, value);
            }
            for (key, value) in secrets {
                caches.put_secret(key, value);
            }
        })
    }
}

fn read<T: DeserializeOwned>(global: &HashMap<GlobalStateKey, Value>, key: GlobalStateKey) -> Option<T> {
    let value = global.get(&key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(key = key.as_str(), "Ignoring malformed setting: {}", e);
            None
        }
    }
}

fn read_mode(global: &HashMap<GlobalStateKey, Value>, mode: Mode) -> ModeApiSettings {
    let keys = mode.keys();
    ModeApiSettings {
        api_provider: read(global, keys.api_provider),
        api_model_id: read(global, keys.api_model_id),
        thinking_budget_tokens: read(global, keys.thinking_budget_tokens),
        reasoning_effort: read(global, keys.reasoning_effort),
        groq_model_id: read(global, keys.groq_model_id),
        groq_model_info: read(global, keys.groq_model_info),
        open_router_model_id: read(global, keys.open_router_model_id),
        open_router_model_info: read(global, keys.open_router_model_info),
        anthropic_model_id: read(global, keys.anthropic_model_id),
        anthropic_model_info: read(global, keys.anthropic_model_info),
    }
}

fn mode_entries(mode: Mode, settings: &ModeApiSettings) -> Vec<(GlobalStateKey, Value)> {
    let keys = mode.keys();
    vec![
        (keys.api_provider, to_value(&settings.api_provider)),
        (keys.api_model_id, to_value(&settings.api_model_id)),
        (
            keys.thinking_budget_tokens,
            to_value(&settings.thinking_budget_tokens),
        ),
        (keys.reasoning_effort, to_value(&settings.reasoning_effort)),
        (keys.groq_model_id, to_value(&settings.groq_model_id)),
        (keys.groq_model_info, to_value(&settings.groq_model_info)),
        (
            keys.open_router_model_id,
            to_value(&settings.open_router_model_id),
        ),
        (
            keys.open_router_model_info,
            to_value(&settings.open_router_model_info),
        ),
        (keys.anthropic_model_id, to_value(&settings.anthropic_model_id)),
        (
            keys.anthropic_model_info,
            to_value(&settings.anthropic_model_info),
        ),
    ]
}

/// `None` serializes to `null`, which the caches treat as delete
fn to_value<T: Serialize>(value: &Option<T>) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
