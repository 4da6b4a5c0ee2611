//! Normalized provider stream

use crate::error::VanguardResult;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Token accounting reported once per response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStreamUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_tokens: u64,
    #[serde(default)]
    pub cache_write_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ApiStreamChunk {
    Text { text: String },
    Usage(ApiStreamUsage),
}

impl ApiStreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Dropping the stream drops the response body and closes the connection
pub type ApiStream = Pin<Box<dyn Stream<Item = VanguardResult<ApiStreamChunk>> + Send>>;

/// Fully drained response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedResponse {
    pub text: String,
    pub usage: Option<ApiStreamUsage>,
}

/// Drain a stream into its text and last usage report
pub async fn collect_stream(mut stream: ApiStream) -> VanguardResult<CollectedResponse> {
    let mut response = CollectedResponse::default();
    while let Some(chunk) = stream.next().await {
        match chunk? {
            ApiStreamChunk::Text { text } => response.text.push_str(&text),
            ApiStreamChunk::Usage(usage) => response.usage = Some(usage),
        }
    }
    Ok(response)
}
