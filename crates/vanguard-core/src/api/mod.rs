//! LLM provider configuration, handlers and normalized streaming

pub mod configuration;
pub mod factory;
pub mod handler;
pub mod messages;
pub mod models;
pub mod providers;
pub mod retry;
pub mod sse_decoder;
pub mod stream;

pub use configuration::{ApiConfiguration, ApiProvider, Mode, ModeApiSettings, ModeKeys};
pub use factory::{ProviderEndpoints, build_api_handler, build_api_handler_with};
pub use handler::{ApiHandler, ApiHandlerModel};
pub use messages::{ApiMessage, ContentBlock, ImageSource, MessageContent, MessageRole};
pub use models::{ContextWindowInfo, ModelCatalog, ModelInfo, context_window_info};
pub use retry::{RetryPolicy, with_retry};
pub use sse_decoder::{SseDecoder, SseEvent};
pub use stream::{ApiStream, ApiStreamChunk, ApiStreamUsage, CollectedResponse, collect_stream};
