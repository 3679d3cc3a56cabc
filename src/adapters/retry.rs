use crate::utils::error::{HeatmapError, Result};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed-delay retry: the same pause between every attempt, no jitter and no
/// exponential growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Runs `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out. The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_retries.max(1);
        let mut current = 1;

        loop {
            tracing::info!("🌐 Upstream request attempt {}/{}", current, attempts);

            match attempt(current).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    tracing::warn!("Attempt {}/{} failed: {}", current, attempts, e);
                    if current >= attempts {
                        return Err(HeatmapError::ExhaustedRetriesError {
                            attempts,
                            last: Box::new(e),
                        });
                    }

                    tracing::info!("⏳ Waiting {:?} before retrying", self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                    current += 1;
                }
            }
        }
    }
}
