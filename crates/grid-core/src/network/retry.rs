//! Exponential backoff for flaky network calls.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Randomize each delay within `[delay / 2, delay * 3 / 2)`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..self
        }
    }

    pub fn with_base_delay(self, base_delay: Duration) -> Self {
        Self { base_delay, ..self }
    }

    pub fn with_jitter(self, jitter: bool) -> Self {
        Self { jitter, ..self }
    }

    /// Wait before the retry that follows failed attempt `failed`
    /// (1-based): `base_delay * 2^(failed - 1)`, capped at `max_delay`.
    pub fn backoff(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        if !self.jitter {
            return delay;
        }
        let factor: f64 = rand::rng().random_range(0.5..1.5);
        delay.mul_f64(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects its error or
/// `policy.max_attempts` is reached. Also returns how many attempts ran.
pub async fn retry_async<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts = 0;
    let result = loop {
        attempts += 1;
        let error = match operation().await {
            Ok(value) => break Ok(value),
            Err(e) => e,
        };
        if attempts >= policy.max_attempts || !should_retry(&error) {
            break Err(error);
        }
        let wait = policy.backoff(attempts);
        warn!(
            "Attempt {} of {} failed ({}), next try in {:?}",
            attempts, policy.max_attempts, error, wait
        );
        tokio::time::sleep(wait).await;
    };

    if attempts > 1 {
        match &result {
            Ok(_) => debug!("Succeeded on attempt {}", attempts),
            Err(e) => warn!("Gave up after {} attempts: {}", attempts, e),
        }
    }
    (result, attempts)
}
