//! Persisted provider configuration and the plan/act mode split

use super::models::ModelInfo;
use crate::error::VanguardError;
use crate::state::GlobalStateKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating mode. Each mode carries its own provider and model settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Plan,
    #[default]
    Act,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Plan => "plan",
            Mode::Act => "act",
        }
    }

    /// Global keys holding this mode's settings
    pub fn keys(&self) -> ModeKeys {
        match self {
            Mode::Plan => ModeKeys {
                api_provider: GlobalStateKey::PlanModeApiProvider,
                api_model_id: GlobalStateKey::PlanModeApiModelId,
                thinking_budget_tokens: GlobalStateKey::PlanModeThinkingBudgetTokens,
                reasoning_effort: GlobalStateKey::PlanModeReasoningEffort,
                groq_model_id: GlobalStateKey::PlanModeGroqModelId,
                groq_model_info: GlobalStateKey::PlanModeGroqModelInfo,
                open_router_model_id: GlobalStateKey::PlanModeOpenRouterModelId,
                open_router_model_info: GlobalStateKey::PlanModeOpenRouterModelInfo,
                anthropic_model_id: GlobalStateKey::PlanModeAnthropicModelId,
                anthropic_model_info: GlobalStateKey::PlanModeAnthropicModelInfo,
            },
            Mode::Act => ModeKeys {
                api_provider: GlobalStateKey::ActModeApiProvider,
                api_model_id: GlobalStateKey::ActModeApiModelId,
                thinking_budget_tokens: GlobalStateKey::ActModeThinkingBudgetTokens,
                reasoning_effort: GlobalStateKey::ActModeReasoningEffort,
                groq_model_id: GlobalStateKey::ActModeGroqModelId,
                groq_model_info: GlobalStateKey::ActModeGroqModelInfo,
                open_router_model_id: GlobalStateKey::ActModeOpenRouterModelId,
                open_router_model_info: GlobalStateKey::ActModeOpenRouterModelInfo,
                anthropic_model_id: GlobalStateKey::ActModeAnthropicModelId,
                anthropic_model_info: GlobalStateKey::ActModeAnthropicModelInfo,
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = VanguardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plan" => Ok(Mode::Plan),
            "act" => Ok(Mode::Act),
            _ => Err(VanguardError::validation_field(
                format!("Unknown mode: {}", s),
                "mode",
            )),
        }
    }
}

/// Storage keys for one mode's [`ModeApiSettings`]
#[derive(Debug, Clone, Copy)]
pub struct ModeKeys {
    pub api_provider: GlobalStateKey,
    pub api_model_id: GlobalStateKey,
    pub thinking_budget_tokens: GlobalStateKey,
    pub reasoning_effort: GlobalStateKey,
    pub groq_model_id: GlobalStateKey,
    pub groq_model_info: GlobalStateKey,
    pub open_router_model_id: GlobalStateKey,
    pub open_router_model_info: GlobalStateKey,
    pub anthropic_model_id: GlobalStateKey,
    pub anthropic_model_info: GlobalStateKey,
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    #[default]
    Cline,
    Anthropic,
    Groq,
    Xai,
}

impl ApiProvider {
    pub const ALL: &'static [ApiProvider] = &[
        ApiProvider::Cline,
        ApiProvider::Anthropic,
        ApiProvider::Groq,
        ApiProvider::Xai,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ApiProvider::Cline => "cline",
            ApiProvider::Anthropic => "anthropic",
            ApiProvider::Groq => "groq",
            ApiProvider::Xai => "xai",
        }
    }

    /// Parse a persisted provider id; `None` for anything unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cline" => Some(ApiProvider::Cline),
            "anthropic" => Some(ApiProvider::Anthropic),
            "groq" => Some(ApiProvider::Groq),
            "xai" => Some(ApiProvider::Xai),
            _ => None,
        }
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Provider/model settings for one mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeApiSettings {
    /// Raw provider id as persisted; unknown ids fall back to Cline
    pub api_provider: Option<String>,
    pub api_model_id: Option<String>,
    pub thinking_budget_tokens: Option<u32>,
    pub reasoning_effort: Option<String>,
    pub groq_model_id: Option<String>,
    pub groq_model_info: Option<ModelInfo>,
    pub open_router_model_id: Option<String>,
    pub open_router_model_info: Option<ModelInfo>,
    pub anthropic_model_id: Option<String>,
    pub anthropic_model_info: Option<ModelInfo>,
}

/// View over the global and secret keys a handler needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    pub cline_account_id: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub xai_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub open_router_provider_sorting: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub favorited_model_ids: Option<Vec<String>>,
    pub plan_mode: ModeApiSettings,
    pub act_mode: ModeApiSettings,
}

impl ApiConfiguration {
    pub fn mode(&self, mode: Mode) -> &ModeApiSettings {
        match mode {
            Mode::Plan => &self.plan_mode,
            Mode::Act => &self.act_mode,
        }
    }

    pub fn mode_mut(&mut self, mode: Mode) -> &mut ModeApiSettings {
        match mode {
            Mode::Plan => &mut self.plan_mode,
            Mode::Act => &mut self.act_mode,
        }
    }

    /// Provider selected for `mode`, falling back to Cline
    pub fn provider_for(&self, mode: Mode) -> ApiProvider {
        self.mode(mode)
            .api_provider
            .as_deref()
            .and_then(ApiProvider::parse)
            .unwrap_or_default()
    }
}
