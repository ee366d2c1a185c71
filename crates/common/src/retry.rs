//! Bounded retry policy for embedding provider calls
//!
//! Transient provider failures are retried up to `max_attempts` with the
//! configured delay. Quota exhaustion and every non-provider error are
//! returned immediately.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::Result;

/// Delay between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelayStrategy {
    /// Same delay after every failed attempt
    Fixed { delay_ms: u64 },

    /// `base_ms * 2^(attempt - 1)`, capped at `max_ms`
    Exponential { base_ms: u64, max_ms: u64 },
}

impl DelayStrategy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential { base_ms, max_ms } => {
                let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
                Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }
}

/// Retry policy value injected into provider clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay strategy between attempts
    pub delay: DelayStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: DelayStrategy::Exponential {
                base_ms: 1000,
                max_ms: 8000,
            },
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: DelayStrategy::Fixed { delay_ms: 0 },
        }
    }

    /// Fixed-delay policy
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay: DelayStrategy::Fixed {
                delay_ms: delay.as_millis() as u64,
            },
        }
    }
}

/// Clock abstraction for waiting between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `call` under `policy`, passing the 1-based attempt number.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation, attempt, max_attempts, e, delay
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReciperankError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let delay = DelayStrategy::Exponential {
            base_ms: 100,
            max_ms: 350,
        };
        assert_eq!(delay.delay_for(1), Duration::from_millis(100));
        assert_eq!(delay.delay_for(2), Duration::from_millis(200));
        assert_eq!(delay.delay_for(3), Duration::from_millis(350));
        assert_eq!(delay.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::fixed(3, Duration::from_millis(50));

        let value = retry(&policy, &sleeper, "embed", |attempt| async move {
            if attempt < 3 {
                Err(ReciperankError::provider("timeout"))
            } else {
                Ok(attempt)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(
            *sleeper.slept.lock().unwrap(),
            vec![Duration::from_millis(50), Duration::from_millis(50)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(2, Duration::from_millis(10));

        let result: Result<()> = retry(&policy, &sleeper, "embed", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReciperankError::provider("503")) }
        })
        .await;

        assert!(matches!(result, Err(ReciperankError::Provider(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.slept.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quota_is_never_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry(&RetryPolicy::default(), &sleeper, "embed", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReciperankError::quota_exceeded("HTTP 429")) }
        })
        .await;

        assert!(matches!(result, Err(ReciperankError::QuotaExceeded(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }
}
