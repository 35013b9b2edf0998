//! Bounded exponential-backoff retry around a single stage call.
//!
//! Only errors whose [`PipelineError::is_retryable`] is true are retried.
//! Rejections (4xx), malformed bodies and failed jobs return immediately.
//! Backoff sleeps end early on cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::PipelineError;
use crate::types::Stage;

/// Retry schedule for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            multiplier: if config.backoff_multiplier.is_finite() {
                config.backoff_multiplier.max(1.0)
            } else {
                1.0
            },
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1`, where `attempt` is zero-based.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(scaled)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// # Errors
    ///
    /// The last error from `op`, or [`PipelineError::Cancelled`] for
    /// `stage` if `cancel` fires first.
    pub async fn run<T, F, Fut>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 0u32;
        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage }),
                outcome = op() => outcome,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempt += 1;
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = self.backoff_for(attempt - 1);
            tracing::warn!(
                %stage,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient failure; retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
