use serde::{Deserialize, Serialize};
use std::fmt;

/// Single search hit, as returned by the search provider and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub relevance_score: f64,
}

impl SearchResult {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: String::new(),
            relevance_score: 0.0,
        }
    }
}

/// Source tier of a resolved document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocTier {
    Proven,
    Cached,
    Fresh,
}

impl fmt::Display for DocTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocTier::Proven => write!(f, "proven"),
            DocTier::Cached => write!(f, "cached"),
            DocTier::Fresh => write!(f, "fresh"),
        }
    }
}

/// Document selected by the resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedDoc {
    #[serde(flatten)]
    pub result: SearchResult,
    pub tier: DocTier,
}

impl ResolvedDoc {
    pub fn url(&self) -> &str {
        &self.result.url
    }
}

/// Aggregated effectiveness of one documentation URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEffectiveness {
    pub url: String,
    pub title: String,
    pub avg_score: f64,
    pub uses: u32,
    /// Fraction of uses whose pattern met the threshold
    pub success_rate: f64,
}

/// Search cache counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total: u64,
    pub live: u64,
}
