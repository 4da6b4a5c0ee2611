//! Glue between the state manager, the active provider handler and TTS
//!
//! The controller owns the current [`Mode`] and the handler built for it.
//! Anything that changes credentials or mode rebuilds the handler, so
//! [`Controller::api_handler`] always reflects persisted settings.

use crate::api::{ApiConfiguration, ApiHandler, Mode, ProviderEndpoints, build_api_handler_with};
use crate::config::VanguardConfig;
use crate::error::VanguardResult;
use crate::state::{GlobalStateKey, SecretKey, StateManager};
use crate::tts::{TtsOptions, TtsRequest, TtsResponse, TtsService};
use futures::Stream;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Size of each audio chunk handed to callers
pub const AUDIO_CHUNK_SIZE: usize = 8192;

pub type AudioChunks = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    pub endpoints: ProviderEndpoints,
    /// Used when the persisted `requestTimeoutMs` is unset
    pub request_timeout_ms: Option<u64>,
    pub tts: TtsOptions,
}

impl ControllerOptions {
    pub fn from_config(config: &VanguardConfig) -> Self {
        Self {
            endpoints: config.providers.endpoints.clone(),
            request_timeout_ms: config.providers.request_timeout_ms,
            tts: config.tts.options(),
        }
    }
}

pub struct Controller {
    state: Arc<StateManager>,
    options: ControllerOptions,
    mode: RwLock<Mode>,
    api_handler: RwLock<ApiHandler>,
    tts: OnceCell<TtsService>,
}

impl Controller {
    /// Build a controller over an initialized state manager
    pub fn new(state: Arc<StateManager>, options: ControllerOptions) -> VanguardResult<Self> {
        let mode = read_mode(&state)?;
        let handler = build_handler(&state, &options, mode)?;
        info!(mode = %mode, provider = %handler.provider(), "Controller ready");

        Ok(Self {
            state,
            options,
            mode: RwLock::new(mode),
            api_handler: RwLock::new(handler),
            tts: OnceCell::new(),
        })
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        *self.mode.read()
    }

    /// Handler for the current mode and settings
    pub fn api_handler(&self) -> ApiHandler {
        self.api_handler.read().clone()
    }

    pub fn api_configuration(&self) -> VanguardResult<ApiConfiguration> {
        self.state.get_api_configuration()
    }

    /// Rebuild the handler from current settings
    pub fn rebuild_api_handler(&self) -> VanguardResult<()> {
        let mode = self.mode();
        let handler = build_handler(&self.state, &self.options, mode)?;
        debug!(mode = %mode, provider = %handler.provider(), model = %handler.get_model().id, "API handler rebuilt");
        *self.api_handler.write() = handler;
        Ok(())
    }

    pub fn set_mode(&self, mode: Mode) -> VanguardResult<()> {
        self.state.set_global(GlobalStateKey::Mode, json!(mode.as_str()))?;
        *self.mode.write() = mode;
        self.rebuild_api_handler()
    }

    /// Validate and store one credential. An empty value deletes it.
    ///
    /// Unknown key names are rejected before the state manager is touched.
    pub fn save_api_key(&self, key: &str, value: &str) -> VanguardResult<()> {
        let secret = SecretKey::validate(key)?;
        let value = value.trim();
        let value = (!value.is_empty()).then_some(value);

        self.state.set_secret(secret, value)?;
        if secret == SecretKey::FalApiKey {
            if let Some(tts) = self.tts.get() {
                tts.set_api_key(value.map(str::to_string));
            }
        }
        info!(key = %secret, deleted = value.is_none(), "API key saved");
        self.rebuild_api_handler()
    }

    /// Wipe global settings and secrets, then return to the default mode
    pub async fn reset_global_state(&self) -> VanguardResult<()> {
        self.state.reset_global_state().await?;
        if let Some(tts) = self.tts.get() {
            tts.set_api_key(None);
            tts.clear_cache();
        }
        *self.mode.write() = read_mode(&self.state)?;
        self.rebuild_api_handler()
    }

    pub async fn reset_workspace_state(&self) -> VanguardResult<()> {
        self.state.reset_workspace_state().await?;
        self.rebuild_api_handler()
    }

    /// The TTS service, created on first use with the stored fal.ai key
    pub fn tts_service(&self) -> VanguardResult<&TtsService> {
        self.tts.get_or_try_init(|| {
            let api_key = self.state.get_secret(SecretKey::FalApiKey)?;
            TtsService::new(api_key, self.options.tts.clone())
        })
    }

    /// Generate speech for `text`, returned as fixed-size chunks
    pub async fn generate_speech(&self, text: &str) -> VanguardResult<AudioChunks> {
        let response = self
            .tts_service()?
            .generate_speech(self.speech_request(text)?)
            .await?;
        debug!(bytes = response.audio_data.len(), "Streaming generated speech");
        Ok(audio_chunks(response.audio_data))
    }

    /// Cached speech, generating it on a miss.
    ///
    /// Never fails: errors are logged and yield a single empty chunk.
    pub async fn get_cached_speech(&self, text: &str) -> AudioChunks {
        match self.cached_or_generated(text).await {
            Ok(response) => audio_chunks(response.audio_data),
            Err(e) => {
                warn!("Speech retrieval failed: {}", e);
                Box::pin(tokio_stream::once(Vec::new()))
            }
        }
    }

    async fn cached_or_generated(&self, text: &str) -> VanguardResult<TtsResponse> {
        let tts = self.tts_service()?;
        if let Some(cached) = tts.get_cached_speech(text) {
            return Ok(cached);
        }
        tts.generate_speech(self.speech_request(text)?).await
    }

    fn speech_request(&self, text: &str) -> VanguardResult<TtsRequest> {
        let voice = self
            .state
            .get_global_as::<String>(GlobalStateKey::TtsVoice)
            .unwrap_or_else(|e| {
                warn!("Ignoring stored TTS voice: {}", e);
                None
            })
            .filter(|voice| !voice.is_empty());
        Ok(TtsRequest {
            text: text.to_string(),
            voice,
            speed: None,
        })
    }
}

fn read_mode(state: &StateManager) -> VanguardResult<Mode> {
    let mode = state
        .get_global_as::<String>(GlobalStateKey::Mode)?
        .and_then(|raw| match raw.parse::<Mode>() {
            Ok(mode) => Some(mode),
            Err(_) => {
                warn!(mode = %raw, "Unknown stored mode, using default");
                None
            }
        })
        .unwrap_or_default();
    Ok(mode)
}

fn build_handler(
    state: &StateManager,
    options: &ControllerOptions,
    mode: Mode,
) -> VanguardResult<ApiHandler> {
    let mut config = state.get_api_configuration()?;
    if config.request_timeout_ms.is_none() {
        config.request_timeout_ms = options.request_timeout_ms;
    }
    Ok(build_api_handler_with(&config, mode, &options.endpoints))
}

fn audio_chunks(audio: Vec<u8>) -> AudioChunks {
    let chunks: Vec<Vec<u8>> = audio
        .chunks(AUDIO_CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect();
    Box::pin(tokio_stream::iter(chunks))
}
