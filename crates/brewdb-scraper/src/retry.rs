//! Retry policy and backoff loop shared by every fetch the scraper makes.
//!
//! All attempt failures are treated as transient: timeouts, non-2xx statuses,
//! network errors, and browser navigation errors. Cancellation is the only
//! condition that ends the loop early.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AttemptError, ScraperError};

/// Bounded retry with exponential backoff.
///
/// `max_attempts` counts the first try. The delay before 1-indexed attempt
/// `n` (for `n >= 2`) is `base_delay * 2^(n-2)`:
///
/// | Attempt | Sleep before attempt |
/// |---------|----------------------|
/// | 1       | none                 |
/// | 2       | `base_delay`         |
/// | 3       | `2 * base_delay`     |
/// | 4       | `4 * base_delay`     |
///
/// `jitter` adds a uniformly random extra wait in `[0, jitter)` on top of
/// each delay. It is zero by default so schedules are reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            jitter: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// A policy that tries once and never sleeps.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Backoff before the 1-indexed `attempt`, without jitter. `None` for the
    /// first attempt.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 {
            return None;
        }
        let factor = 1u32 << (attempt - 2).min(31);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Every backoff the policy can produce, in order.
    #[must_use]
    pub fn delay_schedule(&self) -> Vec<Duration> {
        (2..=self.max_attempts)
            .filter_map(|n| self.delay_before(n))
            .collect()
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter.is_zero() {
            return delay;
        }
        delay + self.jitter.mul_f64(rand::random::<f64>())
    }
}

/// Source of delays for the backoff loop. Production code sleeps on the tokio
/// timer; tests record the requested durations instead of waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `operation` until it succeeds, the policy is exhausted, or `cancel`
/// fires.
///
/// `operation` receives the 1-indexed attempt number. `label` identifies the
/// target (URL or navigation) in logs and in the terminal error.
///
/// # Errors
///
/// - [`ScraperError::Fetch`] carrying the last [`AttemptError`] once
///   `max_attempts` attempts have failed.
/// - [`ScraperError::Cancelled`] if `cancel` fires before or during an
///   attempt or a backoff sleep.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        if cancel.is_cancelled() {
            return Err(ScraperError::Cancelled);
        }

        tracing::debug!(fetch = label, attempt, max_attempts, "fetch attempt");
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ScraperError::Cancelled),
            result = operation(attempt) => result,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= max_attempts {
            tracing::error!(
                fetch = label,
                attempt,
                max_attempts,
                error = %err,
                "fetch failed; retries exhausted"
            );
            return Err(ScraperError::Fetch {
                target: label.to_owned(),
                attempts: attempt,
                source: err,
            });
        }

        let delay = policy.jittered(policy.delay_before(attempt + 1).unwrap_or_default());
        tracing::warn!(
            fetch = label,
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "fetch failed; retrying after backoff"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ScraperError::Cancelled),
            () = sleeper.sleep(delay) => {}
        }
        attempt += 1;
    }
}
