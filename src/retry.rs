//! Bounded retry with exponential backoff.
//!
//! Both network stages (storage fetch, model call) share one schedule:
//! the wait after failed attempt `n` (0-based) is `base_delay * 2^n`, with a
//! per-failure multiplier on top (rate limits wait twice as long). There is
//! no wait after the final attempt.
//!
//! The loop is a plain `for` over attempt indices. Each failure is handed to
//! a classifier that decides whether it is worth another attempt, so the
//! retry rules stay next to the stage that knows its error kinds.
//!
//! Waiting goes through the [`Sleeper`] trait. Production code uses
//! [`TokioSleeper`]; tests inject a recorder and run the whole schedule
//! without wall-clock delay.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Attempt count and base delay for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait before the attempt following failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`; only the retrying task waits.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What the classifier wants done with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Give up now and return the error unchanged.
    Fail,
    /// Try again after `policy.backoff(attempt) * multiplier`.
    Retry { multiplier: u32 },
}

/// Why [`retry_with_backoff`] stopped without a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The classifier refused to retry this error.
    Fatal(E),
    /// The error was retryable, but it was the last allowed attempt.
    Exhausted(E),
    /// The policy allows zero attempts; nothing was tried.
    NoAttempts,
}

/// Run `op` up to `policy.max_attempts()` times.
///
/// `label` names the operation in retry warnings.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    label: &str,
    mut op: F,
    classify: C,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts();

    for attempt in 0..attempts {
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let multiplier = match classify(&err) {
            RetryAction::Fail => return Err(RetryError::Fatal(err)),
            RetryAction::Retry { multiplier } => multiplier,
        };

        if attempt + 1 >= attempts {
            return Err(RetryError::Exhausted(err));
        }

        let delay = policy.backoff(attempt).saturating_mul(multiplier);
        warn!(
            "{} failed, retrying in {:?} (attempt {}/{}): {}",
            label,
            delay,
            attempt + 1,
            attempts,
            err
        );
        sleeper.sleep(delay).await;
    }

    Err(RetryError::NoAttempts)
}
