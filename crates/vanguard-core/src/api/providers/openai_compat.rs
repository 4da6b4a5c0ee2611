//! Shared plumbing for OpenAI-compatible chat-completions providers
//!
//! Used by: cline, groq, xai

use super::error_utils::{handle_http_error, handle_request_error};
use super::{Emitted, SseDialect, sse_stream};
use crate::api::messages::{ApiMessage, ContentBlock, MessageContent};
use crate::api::models::{ModelInfo, calculate_api_cost_openai};
use crate::api::sse_decoder::SseEvent;
use crate::api::stream::{ApiStream, ApiStreamChunk, ApiStreamUsage};
use crate::error::{VanguardError, VanguardResult};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// System prompt followed by the conversation, in chat-completions shape
pub(super) fn convert_messages(system_prompt: &str, messages: &[ApiMessage]) -> Vec<Value> {
    let mut converted = Vec::with_capacity(messages.len() + 1);
    converted.push(json!({"role": "system", "content": system_prompt}));

    for message in messages {
        let content = match &message.content {
            MessageContent::Text(text) => json!(text),
            MessageContent::Blocks(blocks) if blocks.iter().all(is_text) => json!(message.text()),
            MessageContent::Blocks(blocks) => Value::Array(
                blocks
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => json!({"type": "text", "text": text}),
                        ContentBlock::Image { source } => json!({
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{};base64,{}", source.media_type, source.data)
                            }
                        }),
                    })
                    .collect(),
            ),
        };
        converted.push(json!({"role": message.role.as_str(), "content": content}));
    }
    converted
}

fn is_text(block: &ContentBlock) -> bool {
    matches!(block, ContentBlock::Text { .. })
}

/// POST a streaming chat-completions request and decode the response
pub(super) async fn stream_chat_completion(
    client: &Client,
    url: &str,
    bearer: &str,
    body: &Value,
    provider: &'static str,
    info: ModelInfo,
) -> VanguardResult<ApiStream> {
    debug!(provider, url, model = %body["model"], "Sending chat completion request");
    let response = client
        .post(url)
        .bearer_auth(bearer)
        .json(body)
        .send()
        .await
        .map_err(|e| handle_request_error(e, provider))?;

    if !response.status().is_success() {
        return Err(handle_http_error(response, provider).await);
    }

    Ok(sse_stream(
        response.bytes_stream(),
        OpenAiDialect::new(provider, info),
        provider,
    ))
}

pub(super) struct OpenAiDialect {
    provider: &'static str,
    info: ModelInfo,
    usage_reported: bool,
}

impl OpenAiDialect {
    pub fn new(provider: &'static str, info: ModelInfo) -> Self {
        Self {
            provider,
            info,
            usage_reported: false,
        }
    }

    fn parse_usage(&self, usage: &Value) -> ApiStreamUsage {
        let count = |value: &Value| value.as_u64().unwrap_or(0);
        let input_tokens = count(&usage["prompt_tokens"]);
        let output_tokens = count(&usage["completion_tokens"]);
        let cache_read_tokens = usage["prompt_tokens_details"]["cached_tokens"]
            .as_u64()
            .or_else(|| usage["prompt_cache_hit_tokens"].as_u64())
            .unwrap_or(0);
        let cache_write_tokens = count(&usage["cache_creation_input_tokens"]);

        // Gateways that bill on their side report the cost directly
        let total_cost = usage["cost"].as_f64().unwrap_or_else(|| {
            calculate_api_cost_openai(
                &self.info,
                input_tokens,
                output_tokens,
                cache_write_tokens,
                cache_read_tokens,
            )
        });

        ApiStreamUsage {
            input_tokens,
            output_tokens,
            cache_read_tokens,
            cache_write_tokens,
            total_cost: Some(total_cost),
        }
    }
}

impl SseDialect for OpenAiDialect {
    fn on_event(&mut self, event: SseEvent, out: &mut Emitted) {
        if event.is_done() {
            return;
        }
        let data: Value = match serde_json::from_str(&event.data) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping malformed {} chunk: {}", self.provider, e);
                return;
            }
        };

        if let Some(error) = data.get("error").filter(|e| !e.is_null()) {
            let message = error["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            out.push(Err(VanguardError::llm_with_provider(
                format!("stream error: {}", message),
                self.provider,
            )));
            return;
        }

        if let Some(text) = data["choices"][0]["delta"]["content"]
            .as_str()
            .filter(|t| !t.is_empty())
        {
            out.push(Ok(ApiStreamChunk::text(text)));
        }

        let usage = [&data["x_groq"]["usage"], &data["usage"]]
            .into_iter()
            .find(|usage| usage.is_object());
        if let Some(usage) = usage {
            if !self.usage_reported {
                self.usage_reported = true;
                out.push(Ok(ApiStreamChunk::Usage(self.parse_usage(usage))));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::messages::{ImageSource, MessageRole};
    use crate::api::sse_decoder::SseDecoder;

    fn run(body: &str, info: ModelInfo) -> Emitted {
        let mut dialect = OpenAiDialect::new("Groq", info);
        let mut out = Vec::new();
        for event in SseDecoder::new().feed(body.as_bytes()) {
            dialect.on_event(event, &mut out);
        }
        out
    }

    #[test]
    fn test_text_then_groq_usage() {
        let info = ModelInfo {
            input_price: Some(1.0),
            output_price: Some(2.0),
            ..ModelInfo::default()
        };
        let out = run(
            concat!(
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],",
                "\"x_groq\":{\"usage\":{\"prompt_tokens\":1000000,\"completion_tokens\":500000}}}\n\n",
                "data: [DONE]\n\n",
            ),
            info,
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), &ApiStreamChunk::text("Hello"));
        let ApiStreamChunk::Usage(usage) = out[1].as_ref().unwrap() else {
            panic!("expected usage");
        };
        assert_eq!(usage.input_tokens, 1_000_000);
        assert_eq!(usage.output_tokens, 500_000);
        assert!((usage.total_cost.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_reported_cost_and_cached_tokens() {
        let out = run(
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":2,\"prompt_tokens_details\":{\"cached_tokens\":4},\"cost\":0.5}}\n\n",
            ModelInfo::default(),
        );
        let ApiStreamChunk::Usage(usage) = out[0].as_ref().unwrap() else {
            panic!("expected usage");
        };
        assert_eq!(usage.cache_read_tokens, 4);
        assert_eq!(usage.total_cost, Some(0.5));
    }

    #[test]
    fn test_error_chunk() {
        let out = run(
            "data: {\"error\":{\"message\":\"model overloaded\",\"code\":503}}\n\n",
            ModelInfo::default(),
        );
        assert!(out[0].as_ref().unwrap_err().to_string().contains("model overloaded"));
    }

    #[test]
    fn test_convert_messages() {
        let messages = vec![
            ApiMessage::user("hi"),
            ApiMessage {
                role: MessageRole::User,
                content: MessageContent::Blocks(vec![
                    ContentBlock::Text {
                        text: "see".to_string(),
                    },
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                ]),
            },
        ];
        let converted = convert_messages("be brief", &messages);

        assert_eq!(converted[0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(converted[1], json!({"role": "user", "content": "hi"}));
        assert_eq!(
            converted[2]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }
}
