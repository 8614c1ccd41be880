//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/codeswarm/) and project (.codeswarm/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{documentation, network, quality, retry, store};
use crate::types::{Result, SwarmError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM gateway settings
    pub llm: LlmConfig,

    /// Quality gate settings
    pub quality: QualityConfig,

    /// Similar-pattern retrieval settings
    pub retrieval: RetrievalConfig,

    /// Documentation resolver settings
    pub documentation: DocumentationConfig,

    /// External search provider settings
    pub search: SearchConfig,

    /// Knowledge store settings
    pub storage: StorageConfig,

    /// Scorer settings
    pub scoring: ScoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            quality: QualityConfig::default(),
            retrieval: RetrievalConfig::default(),
            documentation: DocumentationConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `SwarmError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=quality::MAX_SCORE).contains(&self.quality.threshold) {
            return Err(SwarmError::Config(format!(
                "quality threshold must be between 0 and 100, got {}",
                self.quality.threshold
            )));
        }

        if self.quality.agent_max_iterations == 0 || self.quality.workflow_max_iterations == 0 {
            return Err(SwarmError::Config(
                "quality iteration limits must be at least 1".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.documentation.search_timeout_secs == 0 {
            return Err(SwarmError::Config(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if !(1..=documentation::MAX_CACHE_TTL_DAYS).contains(&self.documentation.cache_ttl_days) {
            return Err(SwarmError::Config(format!(
                "documentation cache_ttl_days must be between 1 and {}, got {}",
                documentation::MAX_CACHE_TTL_DAYS,
                self.documentation.cache_ttl_days
            )));
        }

        if !(0.0..=1.0).contains(&self.documentation.negative_rate) {
            return Err(SwarmError::Config(format!(
                "documentation negative_rate must be between 0.0 and 1.0, got {}",
                self.documentation.negative_rate
            )));
        }

        if self.storage.pool_size == 0 {
            return Err(SwarmError::Config(
                "storage pool_size must be at least 1".to_string(),
            ));
        }

        if self.documentation.max_results == 0 {
            return Err(SwarmError::Config(
                "documentation max_results must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenRouter-compatible base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_LLM_BASE_URL.to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            max_retries: retry::DEFAULT_MAX_RETRIES,
        }
    }
}

// =============================================================================
// Quality Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Minimum average score to persist a pattern (0-100)
    pub threshold: f64,

    /// Attempts per agent inside the executor loop
    pub agent_max_iterations: u32,

    /// Gate passes across the whole workflow
    pub workflow_max_iterations: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            threshold: quality::DEFAULT_THRESHOLD,
            agent_max_iterations: quality::DEFAULT_AGENT_MAX_ITERATIONS,
            workflow_max_iterations: quality::DEFAULT_WORKFLOW_MAX_ITERATIONS,
        }
    }
}

// =============================================================================
// Retrieval Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Similar patterns attached as few-shot context
    pub pattern_limit: usize,

    /// Minimum stored score for a pattern to be retrieved
    pub min_pattern_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            pattern_limit: store::DEFAULT_PATTERN_LIMIT,
            min_pattern_score: quality::DEFAULT_THRESHOLD,
        }
    }
}

// =============================================================================
// Documentation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationConfig {
    /// Requested documents per resolution
    pub max_results: usize,

    /// Search cache time-to-live in days
    pub cache_ttl_days: i64,

    /// Search call timeout in seconds
    pub search_timeout_secs: u64,

    /// Relationships required before a document counts as proven
    pub min_samples: usize,

    /// Negative-feedback rate above which a document is excluded
    pub negative_rate: f64,

    /// Uses required before a document can be excluded
    pub min_uses: u32,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        Self {
            max_results: documentation::DEFAULT_MAX_RESULTS,
            cache_ttl_days: documentation::DEFAULT_CACHE_TTL_DAYS,
            search_timeout_secs: documentation::SEARCH_TIMEOUT_SECS,
            min_samples: documentation::DEFAULT_MIN_SAMPLES,
            negative_rate: documentation::DEFAULT_NEGATIVE_RATE,
            min_uses: documentation::DEFAULT_MIN_USES,
        }
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Disable to skip fresh searches entirely
    pub enabled: bool,

    /// Search API base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: network::DEFAULT_SEARCH_BASE_URL.to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Knowledge store database path
    pub path: PathBuf,
    /// Pooled SQLite connections
    pub pool_size: u32,
    /// Seconds to wait for a free connection
    pub connection_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".codeswarm/knowledge.db"),
            pool_size: 4,
            connection_timeout_secs: 30,
        }
    }
}

// =============================================================================
// Scoring Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// LLM-as-judge through the gateway
    #[default]
    Llm,
    /// Deterministic local heuristics
    Heuristic,
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringMode::Llm => write!(f, "llm"),
            ScoringMode::Heuristic => write!(f, "heuristic"),
        }
    }
}

impl std::str::FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(ScoringMode::Llm),
            "heuristic" => Ok(ScoringMode::Heuristic),
            _ => Err(format!(
                "Unknown scoring mode: {}. Valid values: llm, heuristic",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub mode: ScoringMode,

    /// Judge model for LLM scoring
    pub model: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::default(),
            model: "anthropic/claude-sonnet-4.5".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quality.threshold, 90.0);
        assert_eq!(config.quality.workflow_max_iterations, 3);
        assert_eq!(config.documentation.cache_ttl_days, 7);
        assert_eq!(config.documentation.max_results, 5);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.quality.threshold = 120.0;
        assert!(matches!(config.validate(), Err(SwarmError::Config(_))));

        let mut config = Config::default();
        config.quality.agent_max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.documentation.negative_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.documentation.cache_ttl_days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.documentation.cache_ttl_days = 100_000_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.documentation.cache_ttl_days = documentation::MAX_CACHE_TTL_DAYS;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.storage.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scoring_mode_parse() {
        assert_eq!("LLM".parse::<ScoringMode>(), Ok(ScoringMode::Llm));
        assert_eq!("heuristic".parse::<ScoringMode>(), Ok(ScoringMode::Heuristic));
        assert!("random".parse::<ScoringMode>().is_err());
    }
}
