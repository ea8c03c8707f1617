//! Retry with exponential backoff for transient site failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::error::SiteResult;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Delay growth factor per attempt.
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0).
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

/// Retry executor.
#[derive(Debug, Clone, Default)]
pub struct Retry {
    config: RetryConfig,
}

impl Retry {
    /// Create a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `f` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<F, Fut, T>(&self, mut f: F) -> SiteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SiteResult<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match f().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if attempt >= self.config.max_attempts || !error.is_transient() {
                        return Err(error);
                    }

                    let delay = self.delay(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after error"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Delay after the given (1-based) failed attempt.
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = (self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent))
            .min(self.config.max_delay.as_secs_f64());

        if self.config.jitter > 0.0 && base > 0.0 {
            let range = base * self.config.jitter;
            let jitter = rand::rng().random_range(-range..=range);
            Duration::from_secs_f64((base + jitter).max(0.0))
        } else {
            Duration::from_secs_f64(base)
        }
    }
}
