//! LLM Gateway Abstraction
//!
//! Defines the LlmProvider trait for plain-text completions.
//! All providers return `LlmResponse` with token usage and latency for metrics.
//!
//! ## Modules
//!
//! - `openrouter`: OpenAI-compatible chat completions (OpenRouter by default)
//! - `retrying`: Decorator applying the shared retry policy to any provider

mod openrouter;
mod retrying;

pub use openrouter::OpenRouterProvider;
pub use retrying::RetryingProvider;

pub use crate::types::{ErrorCategory, ErrorClassifier, ProviderError};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::ai::metrics::SharedMetrics;
use crate::ai::retry::RetryPolicy;
use crate::config::LlmConfig;
use crate::types::{Result, SwarmError, ValidationErrorKind};

// =============================================================================
// Request / Response
// =============================================================================

/// One completion request; every call builds its own
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Gateway model id, e.g. `anthropic/claude-sonnet-4.5`
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Complete LLM response including content, usage and latency
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub content: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u64,
    /// Output tokens (response)
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTiming {
    /// Wall-clock latency in milliseconds
    pub latency_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            latency_ms: duration.as_millis() as u64,
        }
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across workflow stages.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM gateway trait
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a single completion.
    ///
    /// Non-2xx responses map to `SwarmError::Provider`, expired requests to
    /// `SwarmError::Timeout`.
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Read an API key from the environment variable named in config
pub fn api_key_from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Build the gateway from configuration: HTTP client wrapped in the retry policy.
///
/// A missing API key is a validation error; the workflow cannot run without it.
pub fn create_provider(
    config: &LlmConfig,
    timeout: Duration,
    metrics: Option<SharedMetrics>,
) -> Result<SharedProvider> {
    let api_key = api_key_from_env(&config.api_key_env).ok_or_else(|| {
        SwarmError::validation(
            ValidationErrorKind::MissingField,
            config.api_key_env.clone(),
            format!("LLM API key not found. Set {}", config.api_key_env),
        )
    })?;

    let client = OpenRouterProvider::new(&config.base_url, api_key, timeout)?;
    let policy = RetryPolicy::llm(timeout, config.max_retries);

    let mut provider = RetryingProvider::new(Arc::new(client), policy);
    if let Some(metrics) = metrics {
        provider = provider.with_metrics(metrics);
    }
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("x-ai/grok-4", "write tests")
            .with_temperature(0.4)
            .with_max_tokens(12000);
        assert_eq!(request.model, "x-ai/grok-4");
        assert_eq!(request.temperature, 0.4);
        assert_eq!(request.max_tokens, 12000);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::from_openai(100, 50);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_missing_api_key_is_validation_error() {
        let config = LlmConfig {
            api_key_env: "CODESWARM_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        let err = create_provider(&config, Duration::from_secs(1), None).err();
        assert!(matches!(err, Some(SwarmError::Validation(_))));
    }
}
