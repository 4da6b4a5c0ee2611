//! Model metadata, the static provider catalogs and cost accounting

use super::configuration::ApiProvider;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Capabilities and per-million-token prices of one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_images: Option<bool>,
    #[serde(default)]
    pub supports_prompt_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_writes_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_reads_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<PriceTier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<u32>,
    /// Output price while a thinking budget is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price: Option<f64>,
}

/// Prices that apply up to `context_window` input tokens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub context_window: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_writes_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_reads_price: Option<f64>,
}

impl ModelInfo {
    fn priced(
        max_tokens: u32,
        context_window: u32,
        supports_images: bool,
        supports_prompt_cache: bool,
        input_price: f64,
        output_price: f64,
    ) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            context_window: Some(context_window),
            supports_images: Some(supports_images),
            supports_prompt_cache,
            input_price: Some(input_price),
            output_price: Some(output_price),
            ..Self::default()
        }
    }

    fn cache_prices(mut self, writes: Option<f64>, reads: f64) -> Self {
        self.cache_writes_price = writes;
        self.cache_reads_price = Some(reads);
        self
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn with_tiers(mut self, tiers: Vec<PriceTier>) -> Self {
        self.tiers = Some(tiers);
        self
    }

    /// Tier covering `input_tokens`, if the model is tier-priced
    fn tier_for(&self, input_tokens: u64) -> Option<&PriceTier> {
        let tiers = self.tiers.as_ref()?;
        tiers
            .iter()
            .find(|tier| input_tokens <= tier.context_window)
            .or_else(|| tiers.last())
    }
}

/// The static catalog of one provider
#[derive(Debug)]
pub struct ModelCatalog {
    pub provider: ApiProvider,
    pub default_model_id: &'static str,
    models: Vec<(&'static str, ModelInfo)>,
}

impl ModelCatalog {
    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models
            .iter()
            .find(|(model_id, _)| *model_id == id)
            .map(|(_, info)| info)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The default model; catalogs always contain their default
    pub fn default_model(&self) -> (&'static str, ModelInfo) {
        let info = self.get(self.default_model_id).cloned().unwrap_or_default();
        (self.default_model_id, info)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ModelInfo)> {
        self.models.iter().map(|(id, info)| (*id, info))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

pub const OPEN_ROUTER_DEFAULT_MODEL_ID: &str = "x-ai/grok-code-fast-1";
pub const ANTHROPIC_DEFAULT_MODEL_ID: &str = "claude-sonnet-4-20250514";
pub const GROQ_DEFAULT_MODEL_ID: &str = "moonshotai/kimi-k2-instruct-0905";
pub const XAI_DEFAULT_MODEL_ID: &str = "grok-4";

pub fn open_router_default_model_info() -> ModelInfo {
    ModelInfo::priced(8192, 256_000, true, true, 0.2, 1.5)
        .cache_prices(None, 0.02)
        .describe(
            "Grok Code Fast 1 is a speedy and economical reasoning model that excels at agentic coding.",
        )
}

/// Models routed through the Cline gateway; any OpenRouter id is accepted
pub static CLINE_MODELS: Lazy<ModelCatalog> = Lazy::new(|| ModelCatalog {
    provider: ApiProvider::Cline,
    default_model_id: OPEN_ROUTER_DEFAULT_MODEL_ID,
    models: vec![(OPEN_ROUTER_DEFAULT_MODEL_ID, open_router_default_model_info())],
});

pub static ANTHROPIC_MODELS: Lazy<ModelCatalog> = Lazy::new(|| {
    let sonnet_1m_tiers = vec![
        PriceTier {
            context_window: 200_000,
            input_price: Some(3.0),
            output_price: Some(15.0),
            cache_writes_price: Some(3.75),
            cache_reads_price: Some(0.3),
        },
        PriceTier {
            context_window: u64::MAX,
            input_price: Some(6.0),
            output_price: Some(22.5),
            cache_writes_price: Some(7.5),
            cache_reads_price: Some(0.6),
        },
    ];
    ModelCatalog {
        provider: ApiProvider::Anthropic,
        default_model_id: ANTHROPIC_DEFAULT_MODEL_ID,
        models: vec![
            (
                "claude-sonnet-4-20250514:1m",
                ModelInfo::priced(8192, 1_000_000, true, true, 3.0, 15.0)
                    .cache_prices(Some(3.75), 0.3)
                    .with_tiers(sonnet_1m_tiers),
            ),
            (
                "claude-sonnet-4-20250514",
                ModelInfo::priced(8192, 200_000, true, true, 3.0, 15.0)
                    .cache_prices(Some(3.75), 0.3),
            ),
            (
                "claude-opus-4-1-20250805",
                ModelInfo::priced(8192, 200_000, true, true, 15.0, 75.0)
                    .cache_prices(Some(18.75), 1.5),
            ),
            (
                "claude-opus-4-20250514",
                ModelInfo::priced(8192, 200_000, true, true, 15.0, 75.0)
                    .cache_prices(Some(18.75), 1.5),
            ),
            (
                "claude-3-7-sonnet-20250219",
                ModelInfo::priced(8192, 200_000, true, true, 3.0, 15.0)
                    .cache_prices(Some(3.75), 0.3),
            ),
            (
                "claude-3-5-sonnet-20241022",
                ModelInfo::priced(8192, 200_000, true, true, 3.0, 15.0)
                    .cache_prices(Some(3.75), 0.3),
            ),
            (
                "claude-3-5-haiku-20241022",
                ModelInfo::priced(8192, 200_000, false, true, 0.8, 4.0)
                    .cache_prices(Some(1.0), 0.08),
            ),
            (
                "claude-3-opus-20240229",
                ModelInfo::priced(4096, 200_000, true, true, 15.0, 75.0)
                    .cache_prices(Some(18.75), 1.5),
            ),
            (
                "claude-3-haiku-20240307",
                ModelInfo::priced(4096, 200_000, true, true, 0.25, 1.25)
                    .cache_prices(Some(0.3), 0.03),
            ),
        ],
    }
});

pub static GROQ_MODELS: Lazy<ModelCatalog> = Lazy::new(|| ModelCatalog {
    provider: ApiProvider::Groq,
    default_model_id: GROQ_DEFAULT_MODEL_ID,
    models: vec![
        (
            "openai/gpt-oss-120b",
            // Requests above 32K output tokens fail
            ModelInfo::priced(32_766, 131_072, false, false, 0.15, 0.75)
                .describe("120B open-weight Mixture-of-Experts model tuned for reasoning and tool use"),
        ),
        (
            "openai/gpt-oss-20b",
            ModelInfo::priced(32_766, 131_072, false, false, 0.1, 0.5)
                .describe("Compact 20B open-weight Mixture-of-Experts model for reasoning and tool use"),
        ),
        (
            "compound-beta",
            ModelInfo::priced(8192, 128_000, false, false, 0.0, 0.0)
                .describe("Compound model pairing Llama 4 Scout reasoning with Llama 3.3 70B routing"),
        ),
        (
            "compound-beta-mini",
            ModelInfo::priced(8192, 128_000, false, false, 0.0, 0.0)
                .describe("Lightweight compound model for faster tool use"),
        ),
        (
            "deepseek-r1-distill-llama-70b",
            ModelInfo::priced(131_072, 131_072, false, false, 0.75, 0.99)
                .describe("DeepSeek R1 reasoning distilled into Llama 70B"),
        ),
        (
            "meta-llama/llama-4-maverick-17b-128e-instruct",
            ModelInfo::priced(8192, 131_072, true, false, 0.2, 0.6)
                .describe("Llama 4 Maverick 17B with 128 experts and vision support"),
        ),
        (
            "meta-llama/llama-4-scout-17b-16e-instruct",
            ModelInfo::priced(8192, 131_072, true, false, 0.11, 0.34)
                .describe("Llama 4 Scout 17B with 16 experts, optimized for fast inference"),
        ),
        (
            "llama-3.3-70b-versatile",
            ModelInfo::priced(32_768, 131_072, false, false, 0.59, 0.79)
                .describe("Llama 3.3 70B for versatile use cases"),
        ),
        (
            "llama-3.1-8b-instant",
            ModelInfo::priced(131_072, 131_072, false, false, 0.05, 0.08)
                .describe("Llama 3.1 8B optimized for low latency"),
        ),
        (
            "moonshotai/kimi-k2-instruct",
            ModelInfo::priced(16_384, 131_072, false, true, 1.0, 3.0)
                .cache_prices(None, 0.5)
                .describe("Kimi K2, a 1T-parameter Mixture-of-Experts model for agentic coding"),
        ),
        (
            "moonshotai/kimi-k2-instruct-0905",
            ModelInfo::priced(16_384, 262_144, false, true, 0.6, 2.5)
                .cache_prices(None, 0.15)
                .describe("Kimi K2 0905 with a 256K context window and improved agentic coding"),
        ),
    ],
});

pub static XAI_MODELS: Lazy<ModelCatalog> = Lazy::new(|| {
    let grok = |max: u32, context: u32, images: bool, cache: bool, input: f64, output: f64| {
        ModelInfo::priced(max, context, images, cache, input, output)
    };
    ModelCatalog {
        provider: ApiProvider::Xai,
        default_model_id: XAI_DEFAULT_MODEL_ID,
        models: vec![
            (
                "grok-4",
                grok(8192, 262_144, true, true, 3.0, 15.0).cache_prices(None, 0.75),
            ),
            ("grok-3-beta", grok(8192, 131_072, false, true, 3.0, 15.0)),
            ("grok-3-fast-beta", grok(8192, 131_072, false, true, 5.0, 25.0)),
            ("grok-3-mini-beta", grok(8192, 131_072, false, true, 0.3, 0.5)),
            ("grok-3-mini-fast-beta", grok(8192, 131_072, false, true, 0.6, 4.0)),
            ("grok-3", grok(8192, 131_072, false, true, 3.0, 15.0)),
            ("grok-3-fast", grok(8192, 131_072, false, true, 5.0, 25.0)),
            ("grok-3-mini", grok(8192, 131_072, false, true, 0.3, 0.5)),
            ("grok-3-mini-fast", grok(8192, 131_072, false, true, 0.6, 4.0)),
            ("grok-2-latest", grok(8192, 131_072, false, false, 2.0, 10.0)),
            ("grok-2", grok(8192, 131_072, false, false, 2.0, 10.0)),
            ("grok-2-1212", grok(8192, 131_072, false, false, 2.0, 10.0)),
            ("grok-2-vision-latest", grok(8192, 32_768, true, false, 2.0, 10.0)),
            ("grok-2-vision", grok(8192, 32_768, true, false, 2.0, 10.0)),
            ("grok-2-vision-1212", grok(8192, 32_768, true, false, 2.0, 10.0)),
            ("grok-vision-beta", grok(8192, 8192, true, false, 5.0, 15.0)),
            ("grok-beta", grok(8192, 131_072, false, false, 5.0, 15.0)),
        ],
    }
});

/// Static catalog for `provider`
pub fn catalog(provider: ApiProvider) -> &'static ModelCatalog {
    match provider {
        ApiProvider::Cline => &CLINE_MODELS,
        ApiProvider::Anthropic => &ANTHROPIC_MODELS,
        ApiProvider::Groq => &GROQ_MODELS,
        ApiProvider::Xai => &XAI_MODELS,
    }
}

fn per_million(price: Option<f64>, tokens: u64) -> f64 {
    price.unwrap_or(0.0) / 1_000_000.0 * tokens as f64
}

fn cost(
    info: &ModelInfo,
    input_tokens: u64,
    output_tokens: u64,
    cache_write_tokens: u64,
    cache_read_tokens: u64,
    total_input_tokens: u64,
) -> f64 {
    let tier = info.tier_for(total_input_tokens);
    let pick = |tiered: Option<f64>, base: Option<f64>| tiered.or(base);

    let input_price = pick(tier.and_then(|t| t.input_price), info.input_price);
    let output_price = pick(tier.and_then(|t| t.output_price), info.output_price);
    let writes_price = pick(tier.and_then(|t| t.cache_writes_price), info.cache_writes_price);
    let reads_price = pick(tier.and_then(|t| t.cache_reads_price), info.cache_reads_price);

    per_million(writes_price, cache_write_tokens)
        + per_million(reads_price, cache_read_tokens)
        + per_million(input_price, input_tokens)
        + per_million(output_price, output_tokens)
}

/// Cost for Anthropic-style usage, where `input_tokens` excludes cached tokens
pub fn calculate_api_cost_anthropic(
    info: &ModelInfo,
    input_tokens: u64,
    output_tokens: u64,
    cache_write_tokens: u64,
    cache_read_tokens: u64,
) -> f64 {
    let total_input = input_tokens + cache_write_tokens + cache_read_tokens;
    cost(
        info,
        input_tokens,
        output_tokens,
        cache_write_tokens,
        cache_read_tokens,
        total_input,
    )
}

/// Cost for OpenAI-style usage, where `input_tokens` already includes cached tokens
pub fn calculate_api_cost_openai(
    info: &ModelInfo,
    input_tokens: u64,
    output_tokens: u64,
    cache_write_tokens: u64,
    cache_read_tokens: u64,
) -> f64 {
    let uncached = input_tokens.saturating_sub(cache_write_tokens + cache_read_tokens);
    cost(
        info,
        uncached,
        output_tokens,
        cache_write_tokens,
        cache_read_tokens,
        input_tokens,
    )
}

pub const DEFAULT_CONTEXT_WINDOW: u32 = 128_000;

/// Raw context window and the share a conversation may fill before truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindowInfo {
    pub context_window: u32,
    pub max_allowed_size: u32,
}

pub fn context_window_info(info: &ModelInfo) -> ContextWindowInfo {
    let context_window = info
        .context_window
        .filter(|cw| *cw > 0)
        .unwrap_or(DEFAULT_CONTEXT_WINDOW);
    let max_allowed_size = match context_window {
        64_000 => context_window - 27_000,
        128_000 => context_window - 30_000,
        200_000 => context_window - 40_000,
        // A fixed 40K buffer is too small a share of tiny windows
        cw => cw
            .saturating_sub(40_000)
            .max((f64::from(cw) * 0.8) as u32),
    };
    ContextWindowInfo {
        context_window,
        max_allowed_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogs_contain_their_defaults() {
        for provider in ApiProvider::ALL {
            let catalog = catalog(*provider);
            assert!(catalog.contains(catalog.default_model_id), "{}", provider);
            assert_eq!(catalog.provider, *provider);
        }
        assert_eq!(GROQ_MODELS.len(), 11);
        assert_eq!(XAI_MODELS.len(), 17);
    }

    #[test]
    fn test_model_info_camel_case() {
        let info: ModelInfo = serde_json::from_str(
            r#"{"maxTokens": 4096, "contextWindow": 32000, "inputPrice": 1.5}"#,
        )
        .unwrap();
        assert_eq!(info.max_tokens, Some(4096));
        assert!(!info.supports_prompt_cache);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["contextWindow"], 32000);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_anthropic_cost_counts_cache_separately() {
        let info = ANTHROPIC_MODELS.get("claude-sonnet-4-20250514").unwrap();
        let cost = calculate_api_cost_anthropic(info, 1_000_000, 100_000, 0, 1_000_000);
        // 3.0 input + 1.5 output + 0.3 cache reads
        assert!((cost - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_openai_cost_subtracts_cached_input() {
        let info = GROQ_MODELS.get("moonshotai/kimi-k2-instruct-0905").unwrap();
        let cost = calculate_api_cost_openai(info, 2_000_000, 0, 0, 1_000_000);
        // 1M uncached at 0.6 + 1M cached at 0.15
        assert!((cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_tiered_pricing_above_threshold() {
        let info = ANTHROPIC_MODELS.get("claude-sonnet-4-20250514:1m").unwrap();
        let cost = calculate_api_cost_anthropic(info, 300_000, 0, 0, 0);
        assert!((cost - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_context_window_info() {
        let with_window = |cw| ModelInfo {
            context_window: Some(cw),
            ..ModelInfo::default()
        };
        assert_eq!(context_window_info(&with_window(64_000)).max_allowed_size, 37_000);
        assert_eq!(context_window_info(&with_window(128_000)).max_allowed_size, 98_000);
        assert_eq!(context_window_info(&with_window(200_000)).max_allowed_size, 160_000);
        assert_eq!(context_window_info(&with_window(262_144)).max_allowed_size, 222_144);
        assert_eq!(context_window_info(&with_window(32_768)).max_allowed_size, 26_214);

        let fallback = context_window_info(&ModelInfo::default());
        assert_eq!(fallback.context_window, 128_000);
        assert_eq!(fallback.max_allowed_size, 98_000);
    }
}
