//! Exponential-backoff retry layered over stream creation
//!
//! Handlers never retry on their own. Callers that want a policy wrap
//! `create_message` in [`with_retry`]; only the request that opens the stream
//! is retried, never a stream that already started yielding chunks.

use crate::error::{UnifiedError, VanguardResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// `base * 2^attempt` plus up to half of that as jitter, capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter_ms = {
            let half = (exponential.as_millis() / 2) as u64;
            rand::thread_rng().gen_range(0..=half)
        };
        (exponential + Duration::from_millis(jitter_ms)).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy is exhausted. The last error is returned.
#[instrument(skip(policy, operation), fields(max_retries = policy.max_retries))]
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> VanguardResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = VanguardResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(attempt, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if !error.is_retryable() => {
                warn!(error = %error, "Non-retryable error");
                return Err(error);
            }
            Err(error) if attempt >= policy.max_retries => {
                warn!(attempts = attempt + 1, error = %error, "All retry attempts exhausted");
                return Err(error);
            }
            Err(error) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_secs = delay.as_secs_f64(),
                    "Request failed: {}. Retrying",
                    error
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
