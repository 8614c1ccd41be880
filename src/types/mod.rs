pub mod document;
pub mod error;
pub mod feedback;
pub mod pattern;
pub mod role;
pub mod utils;

pub use document::{CacheStats, DocEffectiveness, DocTier, ResolvedDoc, SearchResult};
pub use error::{
    ErrorCategory, ErrorClassifier, ProviderError, Result, ResultExt, SwarmError,
    ValidationError, ValidationErrorKind,
};
pub use feedback::{AgentStats, RATING_RANGE, UserFeedback};
pub use pattern::{AgentOutput, PatternRecord, StoredAgentOutput};
pub use role::AgentRole;
pub use utils::{capitalize_first, estimate_tokens, excerpt, log_filter_error, truncate_chars};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for pattern IDs
///
/// Prevents accidental mixing of pattern IDs with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(String);

impl PatternId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh `pattern_<uuid>` identifier
    pub fn generate() -> Self {
        Self(format!("pattern_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PatternId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PatternId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for PatternId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
