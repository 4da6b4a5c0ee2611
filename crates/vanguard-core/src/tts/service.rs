//! fal.ai queue client for speech synthesis
//!
//! One generation is submit, poll the status URL until `COMPLETED`, fetch the
//! result, then download the audio it points at. Status and result URLs are
//! per call, so concurrent generations never share polling state.

use super::cache::TtsCache;
use super::types::{CacheStats, DEFAULT_CONTENT_TYPE, TtsOptions, TtsRequest, TtsResponse};
use crate::api::providers::error_utils::sanitize_provider_error_text;
use crate::error::{VanguardError, VanguardResult};
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
    status_url: Option<String>,
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    queue_position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    audio: AudioFile,
}

#[derive(Debug, Deserialize)]
struct AudioFile {
    url: String,
    #[serde(default)]
    content_type: Option<String>,
}

pub struct TtsService {
    api_key: RwLock<Option<String>>,
    options: TtsOptions,
    cache: TtsCache,
    client: Client,
}

impl TtsService {
    pub fn new(api_key: Option<String>, options: TtsOptions) -> VanguardResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| VanguardError::tts(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: RwLock::new(api_key.filter(|key| !key.is_empty())),
            cache: TtsCache::new(options.cache_capacity, options.cache_ttl),
            options,
            client,
        })
    }

    pub fn options(&self) -> &TtsOptions {
        &self.options
    }

    pub fn set_api_key(&self, api_key: Option<String>) {
        *self.api_key.write() = api_key.filter(|key| !key.is_empty());
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.read().is_some()
    }

    /// Speech for `request.text`, from the cache when possible
    #[instrument(skip_all, fields(text_len = request.text.len()))]
    pub async fn generate_speech(&self, request: TtsRequest) -> VanguardResult<TtsResponse> {
        if request.text.trim().is_empty() {
            return Err(VanguardError::validation_field("Text cannot be empty", "text"));
        }
        let api_key = self
            .api_key
            .read()
            .clone()
            .ok_or_else(|| VanguardError::validation_field("Fal.ai API key not configured", "falApiKey"))?;

        if let Some(cached) = self.cache.get(&request.text) {
            debug!("Speech cache hit");
            return Ok(cached);
        }

        let voice = request.voice.as_deref().unwrap_or(&self.options.voice);
        let submitted = self
            .submit(&api_key, request.text.trim(), voice, request.speed)
            .await?;
        info!(request_id = %submitted.request_id, "Speech request queued");

        let (Some(status_url), Some(response_url)) = (submitted.status_url, submitted.response_url)
        else {
            return Err(VanguardError::tts(
                "Fal.ai API error: status and response URLs missing from submit response",
            ));
        };
        let result = self.poll(&api_key, &status_url, &response_url).await?;
        let response = self.download(result.audio).await?;

        info!(bytes = response.audio_data.len(), content_type = %response.content_type, "Speech generated");
        self.cache
            .set(&request.text, response.audio_data.clone(), response.content_type.clone());
        Ok(response)
    }

    async fn submit(
        &self,
        api_key: &str,
        text: &str,
        voice: &str,
        speed: Option<f32>,
    ) -> VanguardResult<SubmitResponse> {
        let url = format!(
            "{}/{}",
            self.options.base_url.trim_end_matches('/'),
            self.options.model_path.trim_start_matches('/')
        );
        debug!(url = %url, voice, "Submitting speech request");
        let mut payload = json!({"prompt": text, "voice": voice});
        if let Some(speed) = speed {
            payload["speed"] = json!(speed);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", api_key))
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, "submit").await?;
        response.json().await.map_err(transport_error)
    }

    /// Poll until the request completes, then fetch its result.
    ///
    /// Transient failures use up attempts; rejected credentials end polling
    /// at once.
    async fn poll(
        &self,
        api_key: &str,
        status_url: &str,
        response_url: &str,
    ) -> VanguardResult<ResultResponse> {
        let max_attempts = self.options.max_poll_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.poll_once(api_key, status_url, response_url).await {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {}
                Err(e) if matches!(e.status_code(), Some(401 | 403)) => return Err(e),
                Err(e) => {
                    warn!(attempt, max_attempts, "Speech status check failed: {}", e);
                    last_error = Some(e);
                }
            }
            if attempt < max_attempts {
                sleep(self.options.poll_interval).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            VanguardError::tts(format!(
                "Fal.ai API error: request timed out after {} status checks",
                max_attempts
            ))
        }))
    }

    async fn poll_once(
        &self,
        api_key: &str,
        status_url: &str,
        response_url: &str,
    ) -> VanguardResult<Option<ResultResponse>> {
        let response = self
            .client
            .get(status_url)
            .header("Authorization", format!("Key {}", api_key))
            .send()
            .await
            .map_err(transport_error)?;
        let status: StatusResponse = check_status(response, "status check")
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        match status.status.as_str() {
            "COMPLETED" => {
                let response = self
                    .client
                    .get(response_url)
                    .header("Authorization", format!("Key {}", api_key))
                    .send()
                    .await
                    .map_err(transport_error)?;
                let result = check_status(response, "result fetch")
                    .await?
                    .json()
                    .await
                    .map_err(transport_error)?;
                Ok(Some(result))
            }
            "IN_QUEUE" | "IN_PROGRESS" => {
                debug!(status = %status.status, queue_position = ?status.queue_position, "Speech pending");
                Ok(None)
            }
            other => Err(VanguardError::tts(format!(
                "Fal.ai API error: unexpected status {}",
                other
            ))),
        }
    }

    async fn download(&self, audio: AudioFile) -> VanguardResult<TtsResponse> {
        let response = self
            .client
            .get(&audio.url)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, "audio download").await?;

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content_type = audio
            .content_type
            .or(header_type)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let audio_data = response.bytes().await.map_err(transport_error)?.to_vec();

        Ok(TtsResponse {
            audio_data,
            content_type,
        })
    }

    /// Cached speech only; never touches the network
    pub fn get_cached_speech(&self, text: &str) -> Option<TtsResponse> {
        self.cache.get(text)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl std::fmt::Debug for TtsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsService")
            .field("has_api_key", &self.has_api_key())
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish()
    }
}

async fn check_status(response: reqwest::Response, step: &str) -> VanguardResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(step, status = status.as_u16(), body = %sanitize_provider_error_text(&body), "Fal.ai request failed");
    Err(status_error(status, step))
}

fn status_error(status: StatusCode, step: &str) -> VanguardError {
    let message = match status.as_u16() {
        401 | 403 => "Invalid API key. Please check your Fal.ai token.".to_string(),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        500..=599 => "Fal.ai service temporarily unavailable. Please try again later.".to_string(),
        _ => format!("Fal.ai API error: {} failed with status {}", step, status),
    };
    VanguardError::tts_with_status(message, status.as_u16())
}

fn transport_error(error: reqwest::Error) -> VanguardError {
    let message = if error.is_timeout() {
        "Fal.ai API error: request timed out".to_string()
    } else {
        format!("Fal.ai API error: {}", error)
    };
    match error.status() {
        Some(status) => VanguardError::tts_with_status(message, status.as_u16()),
        None => VanguardError::tts(message),
    }
}
