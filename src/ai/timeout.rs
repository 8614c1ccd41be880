//! Timeouts for external calls
//!
//! Per-call limits derived from config, plus a helper that converts an
//! elapsed `tokio::time::timeout` into `SwarmError::Timeout`.

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{documentation, network};
use crate::types::{Result, SwarmError};

/// Timeouts for every kind of external call
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// LLM gateway request (default: 2 minutes)
    pub llm_request: Duration,
    /// Search provider call (default: 30 seconds)
    pub search: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(network::DEFAULT_TIMEOUT_SECS),
            search: Duration::from_secs(documentation::SEARCH_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            llm_request: Duration::from_secs(config.llm.timeout_secs),
            search: Duration::from_secs(config.documentation.search_timeout_secs),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns `SwarmError::Timeout` if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(SwarmError::timeout(operation_name, timeout)),
    }
}
