//! Anthropic Messages API handler

use super::LazyClient;
use super::anthropic_stream::{AnthropicDialect, PROVIDER};
use super::error_utils::{handle_http_error, handle_request_error};
use super::sse_stream;
use crate::api::handler::ApiHandlerModel;
use crate::api::messages::{ApiMessage, MessageRole};
use crate::api::models::{ANTHROPIC_MODELS, ModelInfo};
use crate::api::stream::ApiStream;
use crate::error::{VanguardError, VanguardResult};
use serde_json::{Value, json};
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 8192;

#[derive(Debug, Clone, Default)]
pub struct AnthropicOptions {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model_id: Option<String>,
    pub model_info: Option<ModelInfo>,
    pub thinking_budget_tokens: Option<u32>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AnthropicHandler {
    options: AnthropicOptions,
    client: LazyClient,
}

impl AnthropicHandler {
    pub fn new(options: AnthropicOptions) -> Self {
        let client = LazyClient::new(options.request_timeout_ms);
        Self { options, client }
    }

    pub fn options(&self) -> &AnthropicOptions {
        &self.options
    }

    /// Known model, then a custom model with caller-supplied info, then the default
    pub fn get_model(&self) -> ApiHandlerModel {
        if let Some(id) = self.options.model_id.as_deref() {
            if let Some(info) = ANTHROPIC_MODELS.get(id) {
                return ApiHandlerModel::new(id, info.clone());
            }
            if let Some(info) = &self.options.model_info {
                return ApiHandlerModel::new(id, info.clone());
            }
        }
        let (id, info) = ANTHROPIC_MODELS.default_model();
        ApiHandlerModel::new(id, info)
    }

    fn request_body(&self, system_prompt: &str, messages: &[ApiMessage]) -> VanguardResult<Value> {
        let model = self.get_model();
        let caching = model.info.supports_prompt_cache;

        let mut wire_messages = serde_json::to_value(messages)?;
        let system = if caching {
            mark_cache_breakpoints(&mut wire_messages, messages);
            json!([{
                "type": "text",
                "text": system_prompt,
                "cache_control": {"type": "ephemeral"}
            }])
        } else {
            json!(system_prompt)
        };

        let mut body = json!({
            "model": model.id,
            "max_tokens": model.info.max_tokens.filter(|m| *m > 0).unwrap_or(DEFAULT_MAX_TOKENS),
            "system": system,
            "messages": wire_messages,
            "stream": true,
        });
        match self.options.thinking_budget_tokens.filter(|b| *b > 0) {
            // Extended thinking rejects any temperature but the default
            Some(budget) => {
                body["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
            }
            None => body["temperature"] = json!(0),
        }
        Ok(body)
    }

    #[instrument(skip_all, fields(model), level = "debug")]
    pub async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ApiMessage],
    ) -> VanguardResult<ApiStream> {
        let api_key = self
            .options
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| VanguardError::validation_field("Anthropic API key is required", "apiKey"))?;

        let body = self.request_body(system_prompt, messages)?;
        tracing::Span::current().record("model", body["model"].as_str().unwrap_or_default());

        let base_url = self.options.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        debug!(url = %url, "Sending Anthropic request");

        let response = self
            .client
            .get(PROVIDER)?
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| handle_request_error(e, PROVIDER))?;

        if !response.status().is_success() {
            return Err(handle_http_error(response, PROVIDER).await);
        }

        let info = self.get_model().info;
        Ok(sse_stream(
            response.bytes_stream(),
            AnthropicDialect::new(info),
            PROVIDER,
        ))
    }
}

/// Put `cache_control` on the last text block of the last two user messages
fn mark_cache_breakpoints(wire_messages: &mut Value, messages: &[ApiMessage]) {
    let Some(wire) = wire_messages.as_array_mut() else {
        return;
    };
    let user_indices: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == MessageRole::User)
        .map(|(i, _)| i)
        .collect();

    for &index in user_indices.iter().rev().take(2) {
        let content = &mut wire[index]["content"];
        if let Some(text) = content.as_str().map(str::to_string) {
            *content = json!([{"type": "text", "text": text}]);
        }
        let last_text = content.as_array_mut().and_then(|blocks| {
            blocks
                .iter_mut()
                .rev()
                .find(|block| block["type"] == "text")
        });
        if let Some(block) = last_text {
            block["cache_control"] = json!({"type": "ephemeral"});
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(model_id: Option<&str>) -> AnthropicHandler {
        AnthropicHandler::new(AnthropicOptions {
            api_key: Some("sk-ant".to_string()),
            model_id: model_id.map(str::to_string),
            ..Default::default()
        })
    }

    #[test]
    fn test_get_model_resolution() {
        assert_eq!(handler(None).get_model().id, "claude-sonnet-4-20250514");
        assert_eq!(
            handler(Some("claude-3-opus-20240229")).get_model().info.max_tokens,
            Some(4096)
        );
        // Unknown id without info falls back to the default
        assert_eq!(
            handler(Some("claude-next")).get_model().id,
            "claude-sonnet-4-20250514"
        );

        let custom = AnthropicHandler::new(AnthropicOptions {
            model_id: Some("claude-next".to_string()),
            model_info: Some(ModelInfo {
                max_tokens: Some(1234),
                ..ModelInfo::default()
            }),
            ..Default::default()
        });
        assert_eq!(custom.get_model().id, "claude-next");
        assert_eq!(custom.get_model().info.max_tokens, Some(1234));
    }

    #[test]
    fn test_cache_breakpoints_on_last_two_user_messages() {
        let messages = vec![
            ApiMessage::user("first"),
            ApiMessage::assistant("reply"),
            ApiMessage::user("second"),
            ApiMessage::assistant("reply"),
            ApiMessage::user("third"),
        ];
        let body = handler(None).request_body("system", &messages).unwrap();

        assert_eq!(body["system"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(body["messages"][0]["content"], "first");
        assert_eq!(body["messages"][2]["content"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(body["messages"][4]["content"][0]["text"], "third");
        assert_eq!(body["messages"][4]["content"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["temperature"], 0);
    }

    #[test]
    fn test_no_caching_without_support() {
        let handler = AnthropicHandler::new(AnthropicOptions {
            model_id: Some("custom".to_string()),
            model_info: Some(ModelInfo::default()),
            thinking_budget_tokens: Some(1024),
            ..Default::default()
        });
        let body = handler
            .request_body("system", &[ApiMessage::user("hi")])
            .unwrap();
        assert_eq!(body["system"], "system");
        assert_eq!(body["messages"][0]["content"], "hi");
        assert_eq!(body["thinking"]["budget_tokens"], 1024);
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected_before_io() {
        let handler = AnthropicHandler::new(AnthropicOptions::default());
        let result = handler.create_message("s", &[ApiMessage::user("hi")]).await;
        assert!(matches!(result, Err(VanguardError::Validation { .. })));
    }
}
