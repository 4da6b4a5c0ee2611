//! The provider-agnostic handler surface

use super::configuration::ApiProvider;
use super::messages::ApiMessage;
use super::models::{ContextWindowInfo, ModelInfo, context_window_info};
use super::providers::{AnthropicHandler, ClineHandler, GroqHandler, XaiHandler};
use super::stream::ApiStream;
use crate::error::VanguardResult;

/// A resolved model id with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ApiHandlerModel {
    pub id: String,
    pub info: ModelInfo,
}

impl ApiHandlerModel {
    pub fn new(id: impl Into<String>, info: ModelInfo) -> Self {
        Self {
            id: id.into(),
            info,
        }
    }

    pub fn context_window(&self) -> ContextWindowInfo {
        context_window_info(&self.info)
    }
}

/// One configured provider handler
///
/// Handlers are cheap to build and immutable; a settings change produces a
/// new handler rather than mutating this one.
#[derive(Debug, Clone)]
pub enum ApiHandler {
    Cline(ClineHandler),
    Anthropic(AnthropicHandler),
    Groq(GroqHandler),
    Xai(XaiHandler),
}

impl ApiHandler {
    pub fn provider(&self) -> ApiProvider {
        match self {
            ApiHandler::Cline(_) => ApiProvider::Cline,
            ApiHandler::Anthropic(_) => ApiProvider::Anthropic,
            ApiHandler::Groq(_) => ApiProvider::Groq,
            ApiHandler::Xai(_) => ApiProvider::Xai,
        }
    }

    pub fn get_model(&self) -> ApiHandlerModel {
        match self {
            ApiHandler::Cline(h) => h.get_model(),
            ApiHandler::Anthropic(h) => h.get_model(),
            ApiHandler::Groq(h) => h.get_model(),
            ApiHandler::Xai(h) => h.get_model(),
        }
    }

    /// Thinking budget the handler sends, if the provider takes one
    pub fn thinking_budget_tokens(&self) -> Option<u32> {
        match self {
            ApiHandler::Cline(h) => h.options().thinking_budget_tokens,
            ApiHandler::Anthropic(h) => h.options().thinking_budget_tokens,
            ApiHandler::Groq(_) | ApiHandler::Xai(_) => None,
        }
    }

    /// Start a streaming completion
    ///
    /// Errors before the first byte (missing credentials, HTTP status) are
    /// returned here; errors mid-stream arrive as `Err` items.
    pub async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[ApiMessage],
    ) -> VanguardResult<ApiStream> {
        match self {
            ApiHandler::Cline(h) => h.create_message(system_prompt, messages).await,
            ApiHandler::Anthropic(h) => h.create_message(system_prompt, messages).await,
            ApiHandler::Groq(h) => h.create_message(system_prompt, messages).await,
            ApiHandler::Xai(h) => h.create_message(system_prompt, messages).await,
        }
    }
}
