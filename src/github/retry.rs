//! Backed-off retries for GitHub API calls.
//!
//! Transient errors get retried with exponentially growing delays; permanent
//! errors surface immediately. The default schedule is three retries at 2s,
//! 4s, 8s, so a flapping API holds a caller up for at most ~14 seconds
//! before the error comes back.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::GitHubApiError;

/// Retry schedule: how many retries and how the delay between them grows.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each subsequent one.
    pub initial_delay: Duration,

    /// Cap on the doubling.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Standard schedule for GitHub calls: 2s, 4s, 8s.
    pub const DEFAULT: Self = RetryConfig {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
    };

    /// Delay before retry number `attempt` (zero-based).
    fn delay(&self, attempt: u32) -> Duration {
        // The shift saturates well before the cap can matter.
        self.initial_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runs `operation`, retrying transient failures on `config`'s schedule.
///
/// Returns the first permanent error, or the last transient one once the
/// schedule is exhausted.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    mut operation: F,
) -> Result<T, GitHubApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GitHubApiError>>,
{
    let mut attempt = 0u32;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !error.kind.is_retriable() || attempt >= config.max_retries {
            return Err(error);
        }

        let delay = config.delay(attempt);
        attempt += 1;
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient GitHub error; retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Millisecond-scale schedule so retry tests finish quickly.
    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(8),
        }
    }

    #[test]
    fn default_schedule_is_2_4_8() {
        let config = RetryConfig::DEFAULT;
        assert_eq!(config.delay(0), Duration::from_secs(2));
        assert_eq!(config.delay(1), Duration::from_secs(4));
        assert_eq!(config.delay(2), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_capped() {
        let config = RetryConfig::DEFAULT;
        assert_eq!(config.delay(3), Duration::from_secs(16));
        assert_eq!(config.delay(30), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn success_needs_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(fast(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, GitHubApiError>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(fast(3), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(GitHubApiError::permanent_without_source("not found")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_error_recovers_on_a_later_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(fast(3), move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if call < 2 {
                    Err(GitHubApiError::transient_without_source("flaky"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_schedule_returns_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(fast(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(GitHubApiError::transient_without_source("still down")) }
        })
        .await;

        assert!(result.is_err());
        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    proptest! {
        #[test]
        fn delays_never_exceed_the_cap(
            initial_ms in 1u64..1_000,
            max_ms in 1_000u64..60_000,
            attempt in 0u32..64,
        ) {
            let config = RetryConfig {
                max_retries: 10,
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_millis(max_ms),
            };
            prop_assert!(config.delay(attempt) <= Duration::from_millis(max_ms));
        }

        #[test]
        fn delays_are_monotone(
            initial_ms in 1u64..1_000,
            max_ms in 1_000u64..60_000,
            attempt in 0u32..62,
        ) {
            let config = RetryConfig {
                max_retries: 10,
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_millis(max_ms),
            };
            prop_assert!(config.delay(attempt + 1) >= config.delay(attempt));
        }

        #[test]
        fn first_delay_is_the_initial_delay(initial_ms in 1u64..10_000) {
            let config = RetryConfig {
                max_retries: 5,
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_secs(3600),
            };
            prop_assert_eq!(config.delay(0), Duration::from_millis(initial_ms));
        }
    }
}
