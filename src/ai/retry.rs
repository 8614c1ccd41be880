//! Retry Combinator
//!
//! Single backoff/timeout policy for every external call: LLM gateway,
//! search provider and knowledge-store writes all go through [`with_retry`].
//!
//! ## Policy
//!
//! - Exponential backoff (default 2s, 4s, 8s) via `backon`
//! - Optional per-attempt timeout; a timed-out attempt counts as a failure
//! - Only recoverable errors are retried (`SwarmError::is_recoverable`)

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use super::timeout::with_timeout;
use crate::constants::retry;
use crate::types::{Result, SwarmError};

/// Backoff and timeout policy for one class of operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Delay multiplier per retry
    pub factor: f32,
    /// Timeout applied to each attempt
    pub attempt_timeout: Option<Duration>,
    /// Randomize delays to avoid synchronized retries
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(retry::BASE_DELAY_SECS),
            max_delay: Duration::from_secs(retry::MAX_DELAY_SECS),
            factor: retry::BACKOFF_FACTOR,
            attempt_timeout: None,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// LLM calls: default backoff, bounded by the request timeout
    pub fn llm(timeout: Duration, max_retries: usize) -> Self {
        Self {
            max_retries,
            attempt_timeout: Some(timeout),
            ..Self::default()
        }
        .with_jitter()
    }

    /// Search calls: one retry, then fall through to the next tier
    pub fn search(timeout: Duration) -> Self {
        Self {
            max_retries: 1,
            attempt_timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Knowledge-store writes: short delays for busy/locked databases
    pub fn storage() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Nominal delays before each retry, without jitter
    pub fn delays(&self) -> Vec<Duration> {
        (0..self.max_retries)
            .map(|n| {
                let scaled = self.base_delay.as_secs_f64() * f64::from(self.factor).powi(n as i32);
                Duration::from_secs_f64(scaled).min(self.max_delay)
            })
            .collect()
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_retries);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `operation` under `policy`, retrying recoverable failures.
///
/// The last error is returned once retries are exhausted.
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempt_timeout = policy.attempt_timeout;
    let attempt = || {
        let fut = operation();
        async move {
            match attempt_timeout {
                Some(timeout) => with_timeout(timeout, fut, operation_name).await,
                None => fut.await,
            }
        }
    };

    attempt
        .retry(policy.backoff())
        .when(SwarmError::is_recoverable)
        .notify(|err: &SwarmError, delay: Duration| {
            warn!(
                operation = operation_name,
                delay_ms = delay.as_millis() as u64,
                retry_after_ms = err.retry_hint().map(|d| d.as_millis() as u64),
                "Retrying after error: {}",
                err
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_default_delays_double() {
        let delays = RetryPolicy::default().delays();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry("flaky", &fast_policy(3), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(SwarmError::provider(ErrorCategory::Transient, "503"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = with_retry("down", &fast_policy(3), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SwarmError::provider(ErrorCategory::Network, "connection refused"))
            }
        })
        .await;

        assert!(matches!(result, Err(SwarmError::Provider(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_recoverable_fails_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = with_retry("auth", &fast_policy(3), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SwarmError::provider(ErrorCategory::Auth, "401"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let policy = RetryPolicy {
            attempt_timeout: Some(Duration::from_millis(10)),
            ..fast_policy(1)
        };

        let result: Result<u32> = with_retry("slow", &policy, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            }
        })
        .await;

        assert!(matches!(result, Err(SwarmError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
