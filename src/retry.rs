//! Bounded retry with exponential backoff for model calls.
//!
//! A [`RetryPolicy`] runs an async operation up to `max_attempts` times,
//! sleeping `initial_delay × multiplier^(n-1)` after the n-th failure. On
//! exhaustion it returns `None` instead of an error, leaving the caller to
//! substitute a degraded value. No jitter, no circuit breaking.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
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
            initial_delay: config.initial_delay(),
            multiplier: config.multiplier.max(1),
        }
    }

    /// Sleep after the `failures`-th failed attempt (1-based).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(failures.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Retry every failure.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Option<T>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(label, |_: &E| true, op).await
    }

    /// Retry failures accepted by `retry_if`; any other failure ends the
    /// loop immediately with `None`.
    pub async fn run_if<T, E, P, F, Fut>(&self, label: &str, retry_if: P, mut op: F) -> Option<T>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut failures = 0u32;
        loop {
            match op().await {
                Ok(value) => return Some(value),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        op = label,
                        attempt = failures,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "model call failed"
                    );

                    if !retry_if(&e) {
                        tracing::error!(
                            op = label,
                            error = %e,
                            "model call failed with a non-retryable error"
                        );
                        return None;
                    }
                    if failures >= self.max_attempts {
                        tracing::error!(
                            op = label,
                            attempts = failures,
                            "model call failed after retries"
                        );
                        return None;
                    }

                    tokio::time::sleep(self.delay_after(failures)).await;
                }
            }
        }
    }
}
