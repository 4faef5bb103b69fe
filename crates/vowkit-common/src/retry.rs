//! Bounded retry for precache fetches.
//!
//! Install is all-or-nothing, so a single transient failure on one
//! manifest fetch would scrap the whole install. A [`RetryPolicy`] gives
//! each fetch a fixed number of tries with a doubling, capped delay
//! between them.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How many times to try a fallible async operation, and how long to
/// wait between tries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// One attempt, no retries. Keeps the caller fail-fast.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Up to `attempts` tries with a doubling delay between them,
    /// starting at `base_delay` and capped at `max_delay`.
    ///
    /// `attempts` is clamped to at least one, so the operation always
    /// runs even for a zero input.
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Total attempts this policy allows.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay inserted after the given failed attempt (1-indexed).
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = (attempt - 1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Run the operation until it succeeds or the attempts run out,
    /// returning the last error.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt,
                        remaining = self.attempts - attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
