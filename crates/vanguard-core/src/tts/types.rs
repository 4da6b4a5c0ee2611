//! Request, response and option types for speech synthesis

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://queue.fal.run";
pub const DEFAULT_MODEL_PATH: &str = "fal-ai/kokoro/american-english";
pub const DEFAULT_VOICE: &str = "af_heart";
pub const DEFAULT_CONTENT_TYPE: &str = "audio/wav";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TtsRequest {
    pub text: String,
    /// Falls back to [`TtsOptions::voice`]
    pub voice: Option<String>,
    pub speed: Option<f32>,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsResponse {
    pub audio_data: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
}

/// Endpoint, polling and cache settings of a [`super::TtsService`]
#[derive(Debug, Clone, PartialEq)]
pub struct TtsOptions {
    pub base_url: String,
    pub model_path: String,
    pub voice: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 150,
            cache_capacity: 50,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            request_timeout: None,
        }
    }
}
