//! AI Integration Layer
//!
//! LLM gateway, the shared retry/timeout combinator and run metrics.

pub mod metrics;
pub mod provider;
pub mod retry;
pub mod timeout;

pub use metrics::{
    MetricsCollector, MetricsSummary, SharedMetrics, StageMetrics, create_shared_metrics,
};
pub use provider::{
    CompletionRequest, LlmProvider, LlmResponse, OpenRouterProvider, ResponseMetadata,
    ResponseTiming, RetryingProvider, SharedProvider, TokenUsage, api_key_from_env,
    create_provider,
};
pub use retry::{RetryPolicy, with_retry};
pub use timeout::{TimeoutConfig, with_timeout};
