//! Retrying Provider
//!
//! Decorator that runs every completion of an inner provider through
//! [`with_retry`]: exponential backoff for recoverable failures and a
//! per-attempt timeout. Retries and final failures are counted in the
//! shared metrics when attached.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::warn;

use super::{CompletionRequest, LlmProvider, LlmResponse, SharedProvider};
use crate::ai::metrics::SharedMetrics;
use crate::ai::retry::{RetryPolicy, with_retry};
use crate::types::Result;

pub struct RetryingProvider {
    inner: SharedProvider,
    policy: RetryPolicy,
    metrics: Option<SharedMetrics>,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let attempts = AtomicU32::new(0);
        let operation = format!("completion ({})", request.model);

        let result = with_retry(&operation, &self.policy, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.inner.complete(request)
        })
        .await;

        if let Some(metrics) = &self.metrics {
            for _ in 1..attempts.load(Ordering::Relaxed) {
                metrics.record_retry();
            }
            if result.is_err() {
                metrics.record_failure();
            }
        }
        if let Err(e) = &result {
            warn!(provider = self.inner.name(), "Completion failed: {}", e);
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
