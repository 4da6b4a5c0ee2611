//! Builds the handler for the active mode from persisted configuration

use super::configuration::{ApiConfiguration, ApiProvider, Mode};
use super::handler::ApiHandler;
use super::providers::{
    AnthropicHandler, AnthropicOptions, ClineHandler, ClineOptions, GroqHandler, GroqOptions,
    XaiHandler, XaiOptions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Base URL overrides, mostly for gateways and tests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub cline: Option<String>,
    pub anthropic: Option<String>,
    pub groq: Option<String>,
    pub xai: Option<String>,
}

/// Handler for `mode` using the default endpoints
pub fn build_api_handler(config: &ApiConfiguration, mode: Mode) -> ApiHandler {
    build_api_handler_with(config, mode, &ProviderEndpoints::default())
}

/// Handler for `mode`
///
/// A thinking budget at or above the model's output limit would be rejected
/// by the provider, so it is clipped to `max_tokens - 1` and the handler is
/// rebuilt with the clipped value.
pub fn build_api_handler_with(
    config: &ApiConfiguration,
    mode: Mode,
    endpoints: &ProviderEndpoints,
) -> ApiHandler {
    let handler = create_handler(config, mode, endpoints, None);

    let budget = handler.thinking_budget_tokens().filter(|b| *b > 0);
    let max_tokens = handler.get_model().info.max_tokens.filter(|m| *m > 0);
    if let (Some(budget), Some(max_tokens)) = (budget, max_tokens) {
        if budget >= max_tokens {
            let clipped = max_tokens - 1;
            info!(
                mode = %mode,
                budget,
                clipped,
                "Thinking budget exceeds model max tokens, clipping"
            );
            return create_handler(config, mode, endpoints, Some(clipped));
        }
    }
    handler
}

fn create_handler(
    config: &ApiConfiguration,
    mode: Mode,
    endpoints: &ProviderEndpoints,
    budget_override: Option<u32>,
) -> ApiHandler {
    let settings = config.mode(mode);
    let provider = config.provider_for(mode);
    let thinking_budget_tokens = budget_override.or(settings.thinking_budget_tokens);
    debug!(mode = %mode, provider = %provider, "Building API handler");

    match provider {
        ApiProvider::Cline => ApiHandler::Cline(ClineHandler::new(ClineOptions {
            cline_account_id: config.cline_account_id.clone(),
            base_url: endpoints.cline.clone(),
            open_router_model_id: settings.open_router_model_id.clone(),
            open_router_model_info: settings.open_router_model_info.clone(),
            open_router_provider_sorting: config.open_router_provider_sorting.clone(),
            reasoning_effort: settings.reasoning_effort.clone(),
            thinking_budget_tokens,
            request_timeout_ms: config.request_timeout_ms,
        })),
        ApiProvider::Anthropic => ApiHandler::Anthropic(AnthropicHandler::new(AnthropicOptions {
            api_key: config.anthropic_api_key.clone(),
            base_url: config
                .anthropic_base_url
                .clone()
                .or_else(|| endpoints.anthropic.clone()),
            model_id: settings
                .anthropic_model_id
                .clone()
                .or_else(|| settings.api_model_id.clone()),
            model_info: settings.anthropic_model_info.clone(),
            thinking_budget_tokens,
            request_timeout_ms: config.request_timeout_ms,
        })),
        ApiProvider::Groq => ApiHandler::Groq(GroqHandler::new(GroqOptions {
            groq_api_key: config.groq_api_key.clone(),
            base_url: endpoints.groq.clone(),
            groq_model_id: settings.groq_model_id.clone(),
            groq_model_info: settings.groq_model_info.clone(),
            api_model_id: settings.api_model_id.clone(),
            request_timeout_ms: config.request_timeout_ms,
        })),
        ApiProvider::Xai => ApiHandler::Xai(XaiHandler::new(XaiOptions {
            xai_api_key: config.xai_api_key.clone(),
            base_url: endpoints.xai.clone(),
            api_model_id: settings.api_model_id.clone(),
            reasoning_effort: settings.reasoning_effort.clone(),
            request_timeout_ms: config.request_timeout_ms,
        })),
    }
}
