//! Cline gateway handler (OpenRouter models behind an OpenAI-compatible API)

use super::LazyClient;
use super::openai_compat::{convert_messages, stream_chat_completion};
use crate::api::handler::ApiHandlerModel;
use crate::api::messages::ApiMessage;
use crate::api::models::{
    CLINE_MODELS, ModelInfo, OPEN_ROUTER_DEFAULT_MODEL_ID, open_router_default_model_info,
};
use crate::api::stream::ApiStream;
use crate::error::{VanguardError, VanguardResult};
use serde_json::{Value, json};
use tracing::instrument;

pub const DEFAULT_BASE_URL: &str = "https://api.cline.bot/api/v1";
const PROVIDER: &str = "Cline";

#[derive(Debug, Clone, Default)]
pub struct ClineOptions {
    pub cline_account_id: Option<String>,
    pub base_url: Option<String>,
    pub open_router_model_id: Option<String>,
    pub open_router_model_info: Option<ModelInfo>,
    pub open_router_provider_sorting: Option<String>,
    pub reasoning_effort: Option<String>,
    pub thinking_budget_tokens: Option<u32>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ClineHandler {
    options: ClineOptions,
    client: LazyClient,
}

impl ClineHandler {
    pub fn new(options: ClineOptions) -> Self {
        let client = LazyClient::new(options.request_timeout_ms);
        Self { options, client }
    }

    pub fn options(&self) -> &ClineOptions {
        &self.options
    }

    /// The configured model when both id and info are known, else the default
    pub fn get_model(&self) -> ApiHandlerModel {
        if let Some(id) = self.options.open_router_model_id.as_deref() {
            if let Some(info) = &self.options.open_router_model_info {
                return ApiHandlerModel::new(id, info.clone());
            }
            if let Some(info) = CLINE_MODELS.get(id) {
                return ApiHandlerModel::new(id, info.clone());
            }
        }
        ApiHandlerModel::new(OPEN_ROUTER_DEFAULT_MODEL_ID, open_router_default_model_info())
    }

    fn request_body(&self, system_prompt: &str, messages: &[ApiMessage]) -> Value {
        let model = self.get_model();
        let mut body = json!({
            "model": model.id,
            "messages": convert_messages(system_prompt, messages),
            "stream": true,
            "stream_options": {"include_usage": true},
        });
        if let Some(max_tokens) = model.info.max_tokens.filter(|m| *m > 0) {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(sort) = self
            .options
            .open_router_provider_sorting
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            body["provider"] = json!({"sort": sort});
        }

        let budget = self.options.thinking_budget_tokens.filter(|b| *b > 0);
        let effort = self.options.reasoning_effort.as_deref().filter(|e| !e.is_empty());
        if let Some(budget) = budget {
            body["reasoning"] = json!({"max_tokens": budget});
        } else if let Some(effort) = effort {
            body["reasoning"] = json!({"effort": effort});
        }
        body
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ApiMessage],
    ) -> VanguardResult<ApiStream> {
        let account_id = self
            .options
            .cline_account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                VanguardError::validation_field("Cline account id is required", "clineAccountId")
            })?;

        let base_url = self.options.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let body = self.request_body(system_prompt, messages);

        stream_chat_completion(
            self.client.get(PROVIDER)?,
            &url,
            account_id,
            &body,
            PROVIDER,
            self.get_model().info,
        )
        .await
    }
}
