use crate::config::RetryConfig;
use crate::error::{RetryError, SaveError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for SaveError {
    fn is_retryable(&self) -> bool {
        SaveError::is_retryable(self)
    }
}

/// One scheduled retry, handed to the `on_retry` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// The attempt that just failed (1-based)
    pub attempt_number: u32,
    pub scheduled_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total tries including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter upper bound as a fraction of `base_delay`
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter_ratio: config.jitter_ratio,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    pub fn without_jitter(self) -> Self {
        self.with_jitter_ratio(0.0)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn exponential_ms(&self, attempt: u32) -> u64 {
        let base = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = 1_u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        base.saturating_mul(factor)
    }

    fn jitter_ms(&self) -> u64 {
        let ratio = if self.jitter_ratio.is_finite() {
            self.jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let bound = (self.base_delay.as_millis() as f64 * ratio) as u64;
        if bound == 0 {
            0
        } else {
            rand::rng().random_range(0..=bound)
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based):
    /// `min(max_delay, base_delay * 2^(attempt-1) + jitter)`.
    ///
    /// Jitter never exceeds `base_delay`, so successive delays never shrink.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = self.exponential_ms(attempt).saturating_add(self.jitter_ms());
        Duration::from_millis(ms).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempt budget is spent.
///
/// `operation` receives the 1-based attempt number. `on_retry` is called
/// once per scheduled retry, before the backoff delay starts. The delay is a
/// timer raced against `cancel`; an attempt already in flight is allowed to
/// finish.
pub async fn execute_with_retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, RetryError<E>>
where
    E: Retryable + std::error::Error + 'static,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(&RetryAttempt, &E),
{
    let max_attempts = policy.attempts();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempt });
        }

        let err = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Save recovered after retries");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            tracing::warn!(attempt, "Non-retryable error, giving up: {err}");
            return Err(RetryError::NonRetryable {
                attempt,
                source: err,
            });
        }

        if attempt == max_attempts {
            tracing::error!(attempts = max_attempts, "Retry budget exhausted: {err}");
            return Err(RetryError::Exhausted {
                attempts: max_attempts,
                source: err,
            });
        }

        // An attempt that failed after teardown must not report a retry.
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled {
                attempt: attempt + 1,
            });
        }

        let delay = policy.delay_for(attempt);
        let scheduled = RetryAttempt {
            attempt_number: attempt,
            scheduled_delay: delay,
        };
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Save failed, retrying: {err}"
        );
        on_retry(&scheduled, &err);

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(RetryError::Cancelled { attempt: attempt + 1 });
            }
            () = tokio::time::sleep(delay) => {}
        }
    }

    unreachable!("the final attempt always returns")
}
