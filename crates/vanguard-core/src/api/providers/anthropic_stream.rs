//! Anthropic Messages SSE dialect
//!
//! Input and cache token counts arrive in `message_start`, the running output
//! count in `message_delta`. Usage is reported once, on `message_stop`.

use super::{Emitted, SseDialect};
use crate::api::models::{ModelInfo, calculate_api_cost_anthropic};
use crate::api::sse_decoder::SseEvent;
use crate::api::stream::{ApiStreamChunk, ApiStreamUsage};
use crate::error::VanguardError;
use serde_json::Value;
use tracing::{debug, warn};

pub(super) const PROVIDER: &str = "Anthropic";

pub(super) struct AnthropicDialect {
    info: ModelInfo,
    usage: Option<ApiStreamUsage>,
    stopped: bool,
}

impl AnthropicDialect {
    pub fn new(info: ModelInfo) -> Self {
        Self {
            info,
            usage: None,
            stopped: false,
        }
    }

    fn emit_usage(&mut self, out: &mut Emitted) {
        if let Some(mut usage) = self.usage.take() {
            usage.total_cost = Some(calculate_api_cost_anthropic(
                &self.info,
                usage.input_tokens,
                usage.output_tokens,
                usage.cache_write_tokens,
                usage.cache_read_tokens,
            ));
            out.push(Ok(ApiStreamChunk::Usage(usage)));
        }
    }
}

fn tokens(usage: &Value, field: &str) -> Option<u64> {
    usage.get(field).and_then(Value::as_u64)
}

impl SseDialect for AnthropicDialect {
    fn on_event(&mut self, event: SseEvent, out: &mut Emitted) {
        let data: Value = match serde_json::from_str(&event.data) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping malformed {} event: {}", PROVIDER, e);
                return;
            }
        };
        let event_type = event
            .event_type
            .as_deref()
            .or_else(|| data["type"].as_str())
            .unwrap_or_default();

        match event_type {
            "message_start" => {
                let usage = &data["message"]["usage"];
                self.usage = Some(ApiStreamUsage {
                    input_tokens: tokens(usage, "input_tokens").unwrap_or(0),
                    output_tokens: tokens(usage, "output_tokens").unwrap_or(0),
                    cache_write_tokens: tokens(usage, "cache_creation_input_tokens").unwrap_or(0),
                    cache_read_tokens: tokens(usage, "cache_read_input_tokens").unwrap_or(0),
                    total_cost: None,
                });
            }
            "content_block_start" => {
                let block = &data["content_block"];
                if block["type"] == "text" {
                    if let Some(text) = block["text"].as_str().filter(|t| !t.is_empty()) {
                        out.push(Ok(ApiStreamChunk::text(text)));
                    }
                }
            }
            "content_block_delta" => {
                let delta = &data["delta"];
                if delta["type"] == "text_delta" {
                    if let Some(text) = delta["text"].as_str().filter(|t| !t.is_empty()) {
                        out.push(Ok(ApiStreamChunk::text(text)));
                    }
                }
            }
            "message_delta" => {
                let delta_usage = &data["usage"];
                let usage = self.usage.get_or_insert_with(ApiStreamUsage::default);
                if let Some(output) = tokens(delta_usage, "output_tokens") {
                    usage.output_tokens = output;
                }
                if let Some(input) = tokens(delta_usage, "input_tokens") {
                    usage.input_tokens = input;
                }
            }
            "message_stop" => {
                self.stopped = true;
                self.emit_usage(out);
            }
            "error" => {
                let message = data["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown stream error");
                out.push(Err(VanguardError::llm_with_provider(
                    format!("stream error: {}", message),
                    PROVIDER,
                )));
            }
            other => debug!(event = other, "Ignoring {} event", PROVIDER),
        }
    }

    fn on_end(&mut self, out: &mut Emitted) {
        if !self.stopped {
            warn!("{} stream ended without message_stop", PROVIDER);
            self.emit_usage(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sse_decoder::SseDecoder;

    fn run(body: &str) -> Emitted {
        let mut dialect = AnthropicDialect::new(ModelInfo {
            input_price: Some(3.0),
            output_price: Some(15.0),
            ..ModelInfo::default()
        });
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for event in decoder.feed(body.as_bytes()) {
            dialect.on_event(event, &mut out);
        }
        dialect.on_end(&mut out);
        out
    }

    #[test]
    fn test_text_and_usage() {
        let out = run(concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":1000000,\"output_tokens\":1,\"cache_read_input_tokens\":5}}}\n\n",
            "event: ping\ndata: {\"type\":\"ping\"}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":12}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        ));

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), &ApiStreamChunk::text("Hi"));
        let ApiStreamChunk::Usage(usage) = out[1].as_ref().unwrap() else {
            panic!("expected usage");
        };
        assert_eq!(usage.input_tokens, 1_000_000);
        assert_eq!(usage.output_tokens, 12);
        assert_eq!(usage.cache_read_tokens, 5);
        assert!((usage.total_cost.unwrap() - 3.00018).abs() < 1e-9);
    }

    #[test]
    fn test_error_event() {
        let out = run(
            "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
        );
        let err = out[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn test_thinking_deltas_are_not_text() {
        let out = run(concat!(
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"hmm\"}}\n\n",
        ));
        assert!(out.is_empty());
    }
}
