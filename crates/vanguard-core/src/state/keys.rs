//! Closed key sets for the three settings partitions
//!
//! Every persisted setting is addressed by a variant of [`GlobalStateKey`],
//! [`SecretKey`] or [`LocalStateKey`]. Each variant maps to a stable camelCase
//! storage name, and no storage name appears in more than one partition.

use crate::error::VanguardError;
use serde_json::{Value, json};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Common surface of the three key enums
pub trait StateKey:
    Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Partition name used in logs and error messages
    const PARTITION: &'static str;

    /// Stable storage name
    fn as_str(&self) -> &'static str;

    /// Value applied during hydration when the store holds nothing
    fn default_value(&self) -> Option<Value> {
        None
    }
}

macro_rules! state_keys {
    (
        $(#[$meta:meta])*
        $name:ident, $partition:literal {
            $($variant:ident => $storage:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every key of this partition, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $storage),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = VanguardError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($storage => Ok($name::$variant),)+
                    _ => Err(VanguardError::validation_field(
                        format!("Unknown {} key: {}", $partition, s),
                        s,
                    )),
                }
            }
        }

        impl $name {
            #[doc(hidden)]
            pub const PARTITION_NAME: &'static str = $partition;
        }
    };
}

state_keys! {
    /// Cross-workspace, non-secret settings
    GlobalStateKey, "global" {
        AnthropicBaseUrl => "anthropicBaseUrl",
        OpenRouterProviderSorting => "openRouterProviderSorting",
        RequestTimeoutMs => "requestTimeoutMs",
        FavoritedModelIds => "favoritedModelIds",
        TaskHistory => "taskHistory",
        Mode => "mode",
        PlanActSeparateModelsSetting => "planActSeparateModelsSetting",
        TelemetrySetting => "telemetrySetting",
        PreferredLanguage => "preferredLanguage",
        CustomPrompt => "customPrompt",
        AutoApprovalSettings => "autoApprovalSettings",
        BrowserSettings => "browserSettings",
        GlobalClineRulesToggles => "globalClineRulesToggles",
        GlobalWorkflowToggles => "globalWorkflowToggles",
        LastShownAnnouncementId => "lastShownAnnouncementId",
        IsNewUser => "isNewUser",
        WelcomeViewCompleted => "welcomeViewCompleted",
        UserInfo => "userInfo",
        TerminalOutputLineLimit => "terminalOutputLineLimit",
        ShellIntegrationTimeout => "shellIntegrationTimeout",
        EnableCheckpointsSetting => "enableCheckpointsSetting",
        McpMarketplaceEnabled => "mcpMarketplaceEnabled",
        StrictPlanModeEnabled => "strictPlanModeEnabled",
        UseAutoCondense => "useAutoCondense",
        TtsVoice => "ttsVoice",
        PlanModeApiProvider => "planModeApiProvider",
        PlanModeApiModelId => "planModeApiModelId",
        PlanModeThinkingBudgetTokens => "planModeThinkingBudgetTokens",
        PlanModeReasoningEffort => "planModeReasoningEffort",
        PlanModeGroqModelId => "planModeGroqModelId",
        PlanModeGroqModelInfo => "planModeGroqModelInfo",
        PlanModeOpenRouterModelId => "planModeOpenRouterModelId",
        PlanModeOpenRouterModelInfo => "planModeOpenRouterModelInfo",
        PlanModeAnthropicModelId => "planModeAnthropicModelId",
        PlanModeAnthropicModelInfo => "planModeAnthropicModelInfo",
        ActModeApiProvider => "actModeApiProvider",
        ActModeApiModelId => "actModeApiModelId",
        ActModeThinkingBudgetTokens => "actModeThinkingBudgetTokens",
        ActModeReasoningEffort => "actModeReasoningEffort",
        ActModeGroqModelId => "actModeGroqModelId",
        ActModeGroqModelInfo => "actModeGroqModelInfo",
        ActModeOpenRouterModelId => "actModeOpenRouterModelId",
        ActModeOpenRouterModelInfo => "actModeOpenRouterModelInfo",
        ActModeAnthropicModelId => "actModeAnthropicModelId",
        ActModeAnthropicModelInfo => "actModeAnthropicModelInfo",
    }
}

state_keys! {
    /// Credentials. This is also the allow-list accepted by API-key saves.
    SecretKey, "secret" {
        ApiKey => "apiKey",
        ClineAccountId => "clineAccountId",
        OpenRouterApiKey => "openRouterApiKey",
        AwsAccessKey => "awsAccessKey",
        AwsSecretKey => "awsSecretKey",
        AwsSessionToken => "awsSessionToken",
        AwsBedrockApiKey => "awsBedrockApiKey",
        OpenAiApiKey => "openAiApiKey",
        GeminiApiKey => "geminiApiKey",
        OpenAiNativeApiKey => "openAiNativeApiKey",
        OllamaApiKey => "ollamaApiKey",
        DeepSeekApiKey => "deepSeekApiKey",
        RequestyApiKey => "requestyApiKey",
        TogetherApiKey => "togetherApiKey",
        FireworksApiKey => "fireworksApiKey",
        QwenApiKey => "qwenApiKey",
        DoubaoApiKey => "doubaoApiKey",
        MistralApiKey => "mistralApiKey",
        LiteLlmApiKey => "liteLlmApiKey",
        AuthNonce => "authNonce",
        AsksageApiKey => "asksageApiKey",
        XaiApiKey => "xaiApiKey",
        MoonshotApiKey => "moonshotApiKey",
        ZaiApiKey => "zaiApiKey",
        HuggingFaceApiKey => "huggingFaceApiKey",
        NebiusApiKey => "nebiusApiKey",
        SambanovaApiKey => "sambanovaApiKey",
        CerebrasApiKey => "cerebrasApiKey",
        SapAiCoreClientId => "sapAiCoreClientId",
        SapAiCoreClientSecret => "sapAiCoreClientSecret",
        GroqApiKey => "groqApiKey",
        HuaweiCloudMaasApiKey => "huaweiCloudMaasApiKey",
        BasetenApiKey => "basetenApiKey",
        VercelAiGatewayApiKey => "vercelAiGatewayApiKey",
        DifyApiKey => "difyApiKey",
        FalApiKey => "falApiKey",
    }
}

state_keys! {
    /// Settings local to one project checkout
    LocalStateKey, "workspace" {
        LocalClineRulesToggles => "localClineRulesToggles",
        LocalCursorRulesToggles => "localCursorRulesToggles",
        LocalWindsurfRulesToggles => "localWindsurfRulesToggles",
        WorkflowToggles => "workflowToggles",
    }
}

impl StateKey for GlobalStateKey {
    const PARTITION: &'static str = Self::PARTITION_NAME;

    fn as_str(&self) -> &'static str {
        GlobalStateKey::as_str(self)
    }

    fn default_value(&self) -> Option<Value> {
        match self {
            Self::TaskHistory => Some(json!([])),
            Self::Mode => Some(json!("act")),
            Self::IsNewUser => Some(json!(true)),
            Self::PlanActSeparateModelsSetting => Some(json!(false)),
            Self::TelemetrySetting => Some(json!("unset")),
            Self::PreferredLanguage => Some(json!("English")),
            Self::StrictPlanModeEnabled => Some(json!(true)),
            Self::UseAutoCondense => Some(json!(false)),
            Self::EnableCheckpointsSetting => Some(json!(true)),
            Self::McpMarketplaceEnabled => Some(json!(true)),
            Self::ShellIntegrationTimeout => Some(json!(4000)),
            Self::TerminalOutputLineLimit => Some(json!(500)),
            Self::GlobalClineRulesToggles | Self::GlobalWorkflowToggles => Some(json!({})),
            _ => None,
        }
    }
}

impl StateKey for SecretKey {
    const PARTITION: &'static str = Self::PARTITION_NAME;

    fn as_str(&self) -> &'static str {
        SecretKey::as_str(self)
    }
}

impl StateKey for LocalStateKey {
    const PARTITION: &'static str = Self::PARTITION_NAME;

    fn as_str(&self) -> &'static str {
        LocalStateKey::as_str(self)
    }

    fn default_value(&self) -> Option<Value> {
        Some(json!({}))
    }
}

impl SecretKey {
    /// Validate a raw key name against the credential allow-list.
    ///
    /// Runs before any store access, so a rejected key never causes a write.
    pub fn validate(name: &str) -> Result<Self, VanguardError> {
        if name.trim().is_empty() {
            return Err(VanguardError::validation_field("Key is required", "key"));
        }
        name.parse::<SecretKey>().map_err(|_| {
            VanguardError::validation_field(format!("Unknown API key type: {}", name), "key")
        })
    }
}
