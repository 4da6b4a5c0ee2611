//! Provider-specific handlers
//!
//! Every handler turns one vendor's streaming HTTP API into an [`ApiStream`].
//! Anthropic speaks its own Messages SSE dialect; Cline, Groq and xAI are
//! OpenAI-compatible and share [`openai_compat`].

pub mod anthropic;
mod anthropic_stream;
pub mod cline;
pub mod error_utils;
pub mod groq;
mod openai_compat;
pub mod xai;

pub use anthropic::{AnthropicHandler, AnthropicOptions};
pub use cline::{ClineHandler, ClineOptions};
pub use groq::{GroqHandler, GroqOptions};
pub use xai::{XaiHandler, XaiOptions};

use super::sse_decoder::{SseDecoder, SseEvent};
use super::stream::{ApiStream, ApiStreamChunk};
use crate::error::{VanguardError, VanguardResult};
use error_utils::handle_stream_error;
use futures::{Stream, StreamExt};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client built on first request, then reused
#[derive(Debug, Clone, Default)]
pub(crate) struct LazyClient {
    timeout: Option<Duration>,
    client: OnceCell<Client>,
}

impl LazyClient {
    pub fn new(timeout_ms: Option<u64>) -> Self {
        Self {
            timeout: timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis),
            client: OnceCell::new(),
        }
    }

    pub fn get(&self, provider: &str) -> VanguardResult<&Client> {
        self.client.get_or_try_init(|| {
            let mut builder = Client::builder();
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            builder.build().map_err(|e| {
                VanguardError::llm_with_provider(format!("failed to build HTTP client: {}", e), provider)
            })
        })
    }
}

type Emitted = Vec<VanguardResult<ApiStreamChunk>>;

/// Per-dialect interpretation of decoded SSE events
pub(crate) trait SseDialect: Send + 'static {
    fn on_event(&mut self, event: SseEvent, out: &mut Emitted);

    /// Called once after the body ends
    fn on_end(&mut self, _out: &mut Emitted) {}
}

struct SseState<D> {
    decoder: SseDecoder,
    dialect: D,
}

impl<D: SseDialect> SseState<D> {
    fn feed(&mut self, bytes: &[u8]) -> Emitted {
        let mut out = Vec::new();
        for event in self.decoder.feed(bytes) {
            self.dialect.on_event(event, &mut out);
        }
        out
    }

    fn finish(&mut self) -> Emitted {
        let mut out = Vec::new();
        if let Some(event) = self.decoder.finish() {
            self.dialect.on_event(event, &mut out);
        }
        self.dialect.on_end(&mut out);
        out
    }
}

/// Decode an SSE response body into normalized chunks
pub(crate) fn sse_stream<S, B, D>(byte_stream: S, dialect: D, provider: &'static str) -> ApiStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    D: SseDialect,
{
    let state = Arc::new(Mutex::new(SseState {
        decoder: SseDecoder::new(),
        dialect,
    }));
    let tail = Arc::clone(&state);

    let body = byte_stream.map(move |chunk| match chunk {
        Ok(bytes) => state.lock().feed(bytes.as_ref()),
        Err(e) => vec![Err(handle_stream_error(e, provider))],
    });
    let end = futures::stream::once(async move { tail.lock().finish() });

    Box::pin(body.chain(end).flat_map(futures::stream::iter))
}
