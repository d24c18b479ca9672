// retry.rs
use crate::scraper::ScraperError;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Bounded retry with exponential backoff plus jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            max_jitter: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// No sleeping between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base * 2^(attempt-1), capped, plus jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        let base = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.max_jitter.is_zero() {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or attempts run out.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, ScraperError>
    where
        F: FnMut() -> Result<T, ScraperError>,
    {
        let mut attempt = 1;
        loop {
            let start = Instant::now();
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(what, attempt, elapsed = ?start.elapsed(), "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(what, attempt, error = %e, ?delay, "attempt failed, backing off");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
