//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Quality gate constants
pub mod quality {
    /// Minimum average score required to persist a pattern
    pub const DEFAULT_THRESHOLD: f64 = 90.0;

    /// Attempts per agent inside the executor loop
    pub const DEFAULT_AGENT_MAX_ITERATIONS: u32 = 3;

    /// Gate passes across the whole workflow
    pub const DEFAULT_WORKFLOW_MAX_ITERATIONS: u32 = 3;

    /// Upper bound of the score scale
    pub const MAX_SCORE: f64 = 100.0;

    /// Previous output embedded in a feedback prompt (characters)
    pub const FEEDBACK_EXCERPT_CHARS: usize = 500;
}

/// Retry combinator constants
pub mod retry {
    /// Retries after the first attempt
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// First backoff delay; doubles on every retry (2s, 4s, 8s)
    pub const BASE_DELAY_SECS: u64 = 2;

    /// Upper bound for a single backoff delay
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Knowledge store constants
pub mod store {
    /// Stored task text limit (characters)
    pub const MAX_TASK_CHARS: usize = 500;

    /// Stored agent output limit (characters)
    pub const MAX_OUTPUT_CHARS: usize = 10_000;

    /// Maximum keywords extracted for pattern similarity
    pub const MAX_PATTERN_KEYWORDS: usize = 10;

    /// Similar patterns attached as few-shot context
    pub const DEFAULT_PATTERN_LIMIT: usize = 5;

    /// Agent label used for relationships written by the workflow itself
    pub const WORKFLOW_AGENT: &str = "workflow";
}

/// Documentation resolver constants
pub mod documentation {
    /// Requested documents per resolution
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    /// Search cache time-to-live (days)
    pub const DEFAULT_CACHE_TTL_DAYS: i64 = 7;

    /// Upper bound for the search cache time-to-live (days)
    pub const MAX_CACHE_TTL_DAYS: i64 = 3650;

    /// Search call timeout (seconds)
    pub const SEARCH_TIMEOUT_SECS: u64 = 30;

    /// Minimum relationships before a document counts as proven
    pub const DEFAULT_MIN_SAMPLES: usize = 2;

    /// Negative-feedback rate above which a document is excluded
    pub const DEFAULT_NEGATIVE_RATE: f64 = 0.3;

    /// Minimum uses before a document can be excluded
    pub const DEFAULT_MIN_USES: u32 = 3;

    /// Keywords used to build a search query
    pub const QUERY_KEYWORDS: usize = 5;

    /// Suffix appended to every search query
    pub const QUERY_SUFFIX: &str = "documentation tutorial";
}

/// Task validation constants
pub mod task {
    /// Longest accepted task description (characters)
    pub const MAX_TASK_LEN: usize = 10_000;
}

/// HTTP/Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// OpenRouter-compatible chat completions base URL
    pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";

    /// Tavily search API base URL
    pub const DEFAULT_SEARCH_BASE_URL: &str = "https://api.tavily.com";
}
