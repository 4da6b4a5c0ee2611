//! Groq handler
//!
//! OpenAI-compatible endpoint. Groq reports usage under `x_groq.usage` on the
//! final chunk; the shared dialect takes that or a standard `usage` object.

use super::LazyClient;
use super::openai_compat::{convert_messages, stream_chat_completion};
use crate::api::handler::ApiHandlerModel;
use crate::api::messages::ApiMessage;
use crate::api::models::{GROQ_MODELS, ModelInfo};
use crate::api::stream::ApiStream;
use crate::error::{VanguardError, VanguardResult};
use serde_json::{Value, json};
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const PROVIDER: &str = "Groq";

#[derive(Debug, Clone, Default)]
pub struct GroqOptions {
    pub groq_api_key: Option<String>,
    pub base_url: Option<String>,
    pub groq_model_id: Option<String>,
    pub groq_model_info: Option<ModelInfo>,
    /// Generic model id, used when no Groq-specific id is set
    pub api_model_id: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct GroqHandler {
    options: GroqOptions,
    client: LazyClient,
}

impl GroqHandler {
    pub fn new(options: GroqOptions) -> Self {
        let client = LazyClient::new(options.request_timeout_ms);
        Self { options, client }
    }

    pub fn options(&self) -> &GroqOptions {
        &self.options
    }

    pub fn get_model(&self) -> ApiHandlerModel {
        let id = self
            .options
            .groq_model_id
            .as_deref()
            .or(self.options.api_model_id.as_deref())
            .filter(|id| !id.is_empty());

        if let Some(id) = id {
            if let Some(info) = GROQ_MODELS.get(id) {
                return ApiHandlerModel::new(id, info.clone());
            }
            if let Some(info) = &self.options.groq_model_info {
                return ApiHandlerModel::new(id, info.clone());
            }
        }
        let (id, info) = GROQ_MODELS.default_model();
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
        if let Some(max_tokens) = model.info.max_tokens.filter(|m| *m > 0) {
            body["max_completion_tokens"] = json!(max_tokens);
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
            .groq_api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| VanguardError::validation_field("Groq API key is required", "groqApiKey"))?;

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
