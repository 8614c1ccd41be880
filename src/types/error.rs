//! Error Types
//!
//! One error enum for the crate plus the classification used by the retry
//! combinator and by stages deciding whether to skip or abort.
//!
//! - `Provider`/`Timeout`/busy `Database`: external call failed, retried at the call site
//! - `Validation`/`Config`: malformed task or missing credentials, abort the run
//! - Below-threshold quality, cache misses and empty retrievals are not errors

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Provider or model unavailable - skip
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Response body could not be decoded
    ParseError,
    /// Temporary server issues - retry
    Transient,
    /// Unknown error - no retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is worth retrying against the same provider
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError
        )
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Failure of an external provider call (LLM gateway, search, scorer)
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before retry (if applicable)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Message fragments checked in order when no HTTP status is available
const MESSAGE_RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::RateLimit,
        &["rate limit", "too many requests", "quota exceeded"],
    ),
    (
        ErrorCategory::Auth,
        &["api key", "unauthorized", "forbidden", "permission denied"],
    ),
    (
        ErrorCategory::Network,
        &["connection", "dns", "timed out", "timeout", "unreachable"],
    ),
    (
        ErrorCategory::Transient,
        &["service unavailable", "overloaded", "bad gateway", "temporarily"],
    ),
    (ErrorCategory::Unavailable, &["no such model", "not found"]),
    (ErrorCategory::ParseError, &["decode", "parse", "json"]),
];

/// Maps raw provider failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a free-form failure message
    pub fn classify(message: &str, provider: &str) -> ProviderError {
        let lower = message.to_lowercase();
        let category = MESSAGE_RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(*n)))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::Unknown);
        ProviderError::with_provider(category, message, provider)
    }

    /// Classify a non-success HTTP status, keeping the server's retry hint
    pub fn classify_http_status(
        status: u16,
        retry_after: Option<Duration>,
        message: &str,
        provider: &str,
    ) -> ProviderError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400 | 413 | 422 => ErrorCategory::BadRequest,
            404 => ErrorCategory::Unavailable,
            408 | 500 | 502 | 503 | 504 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        let err = ProviderError::with_provider(category, message, provider);
        match retry_after {
            Some(delay) => err.retry_after(delay),
            None => err,
        }
    }

    /// Seconds form of the `Retry-After` header; HTTP-date values are ignored
    pub fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get(reqwest::header::RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Classify a transport-level reqwest failure
    pub fn classify_reqwest(err: &reqwest::Error, provider: &str) -> ProviderError {
        if err.is_timeout() || err.is_connect() {
            return ProviderError::with_provider(ErrorCategory::Network, err.to_string(), provider);
        }
        if err.is_decode() {
            return ProviderError::with_provider(
                ErrorCategory::ParseError,
                err.to_string(),
                provider,
            );
        }
        if let Some(status) = err.status() {
            return Self::classify_http_status(status.as_u16(), None, &err.to_string(), provider);
        }
        Self::classify(&err.to_string(), provider)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// What validation failed
    pub kind: ValidationErrorKind,
    /// Field or component that failed validation
    pub field: Option<String>,
    /// Detailed message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    /// Add field context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Validation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field or credential missing
    MissingField,
    /// Invalid format
    Format,
    /// Value out of range
    Range,
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum SwarmError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    /// External LLM, search or scorer call failed
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Workflow failed: {0}")]
    Workflow(String),
}

impl From<ProviderError> for SwarmError {
    fn from(err: ProviderError) -> Self {
        SwarmError::Provider(err)
    }
}

impl From<ValidationError> for SwarmError {
    fn from(err: ValidationError) -> Self {
        SwarmError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, SwarmError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl SwarmError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a provider error with category
    pub fn provider(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::Provider(ProviderError::new(category, message))
    }

    /// Create a validation error
    pub fn validation(
        kind: ValidationErrorKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation(ValidationError::new(kind, message).with_field(field))
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            Self::Pool(_) => true,
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Suggested delay before retrying, when the error carries a hint
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::Provider(e) => e.retry_after,
            _ => None,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| SwarmError::Storage(format!("{}: {}", context.into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
