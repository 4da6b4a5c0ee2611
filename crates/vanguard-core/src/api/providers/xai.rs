//! xAI (Grok) handler

use super::LazyClient;
use super::openai_compat::{convert_messages, stream_chat_completion};
use crate::api::handler::ApiHandlerModel;
use crate::api::messages::ApiMessage;
use crate::api::models::XAI_MODELS;
use crate::api::stream::ApiStream;
use crate::error::{VanguardError, VanguardResult};
use serde_json::{Value, json};
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
const PROVIDER: &str = "xAI";

#[derive(Debug, Clone, Default)]
pub struct XaiOptions {
    pub xai_api_key: Option<String>,
    pub base_url: Option<String>,
    pub api_model_id: Option<String>,
    pub reasoning_effort: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct XaiHandler {
    options: XaiOptions,
    client: LazyClient,
}

impl XaiHandler {
    pub fn new(options: XaiOptions) -> Self {
        let client = LazyClient::new(options.request_timeout_ms);
        Self { options, client }
    }

    pub fn options(&self) -> &XaiOptions {
        &self.options
    }

    /// Catalog model for the configured id, else the default
    pub fn get_model(&self) -> ApiHandlerModel {
        if let Some((id, info)) = self
            .options
            .api_model_id
            .as_deref()
            .and_then(|id| XAI_MODELS.get(id).map(|info| (id, info)))
        {
            return ApiHandlerModel::new(id, info.clone());
        }
        let (id, info) = XAI_MODELS.default_model();
        ApiHandlerModel::new(id, info)
    }

    fn request_body(&self, system_prompt: &str, messages: &[ApiMessage]) -> Value {
        let model = self.get_model();
        let mut body = json!({
            "model": model.id,
            "messages": convert_messages(system_prompt, messages),
            "stream": true,
            "stream_options": {"include_usage": true},
            "temperature": 0,
        });
        // Only the mini models accept a reasoning effort
        if model.id.contains("3-mini") {
            if let Some(effort) = self.options.reasoning_effort.as_deref().filter(|e| !e.is_empty()) {
                body["reasoning_effort"] = json!(effort);
            }
        }
        body
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ApiMessage],
    ) -> VanguardResult<ApiStream> {
        let api_key = self
            .options
            .xai_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| VanguardError::validation_field("xAI API key is required", "xaiApiKey"))?;

        let base_url = self.options.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let body = self.request_body(system_prompt, messages);

        stream_chat_completion(
            self.client.get(PROVIDER)?,
            &url,
            api_key,
            &body,
            PROVIDER,
            self.get_model().info,
        )
        .await
    }
}
