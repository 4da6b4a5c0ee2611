//! Text-to-speech through the fal.ai queue API, with an in-memory audio cache

pub mod cache;
pub mod service;
pub mod types;

pub use cache::TtsCache;
pub use service::TtsService;
pub use types::{CacheStats, TtsOptions, TtsRequest, TtsResponse};
