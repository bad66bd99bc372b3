//! Bounded retry with linear backoff.
//!
//! Each render is expensive and the companion is a single stateful
//! process, so the policy makes few attempts and backs off gently:
//! attempt k failing waits `k * base_delay` before attempt k+1.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GeneratorSettings;
use crate::domain::GenerationError;

/// Retry policy for generation attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    pub max_attempts: u32,

    /// Backoff unit; the wait after attempt k is `k * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Create from config
    pub fn from_settings(settings: &GeneratorSettings) -> Self {
        Self::new(settings.max_attempts, settings.retry_base_delay)
    }

    /// Wait after a failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    /// Check if another attempt may follow `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts
    /// run out. The operation receives the 1-based attempt number.
    ///
    /// The last attempt's error is returned unchanged. Once `cancel` fires
    /// no further attempt is started and a pending backoff is abandoned.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, GenerationError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Generation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!(attempt, kind = error.kind(), "Terminal error, not retrying");
                return Err(error);
            }

            if !self.should_retry(attempt) {
                return Err(error);
            }

            let delay = self.delay_for_attempt(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                kind = error.kind(),
                error = %error,
                "Generation attempt failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(attempt, "Retry abandoned, operation cancelled");
                    return Err(error);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if cancel.is_cancelled() {
                return Err(error);
            }
        }
    }
}
