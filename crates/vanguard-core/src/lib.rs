//! Vanguard Core Library
//!
//! Headless core of the Vanguard coding agent: debounced settings state
//! with a watched task history, streaming LLM provider handlers, a handler
//! factory driven by plan/act mode, and cached text-to-speech.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod state;
pub mod tts;

// Re-export commonly used types
pub use api::{
    ApiConfiguration, ApiHandler, ApiMessage, ApiProvider, ApiStream, ApiStreamChunk,
    ApiStreamUsage, Mode, ProviderEndpoints, RetryPolicy, build_api_handler,
};
pub use config::{VanguardConfig, load_config};
pub use controller::{AudioChunks, Controller, ControllerOptions};
pub use error::{ResultExt, UnifiedError, UserFriendlyError, VanguardError, VanguardResult};
pub use state::{
    GlobalStateKey, HistoryItem, LocalStateKey, SecretKey, StateManager, StorageContext,
};
pub use tts::{TtsRequest, TtsResponse, TtsService};
