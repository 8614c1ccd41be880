//! Task Similarity Strategies
//!
//! Pattern retrieval asks a [`SimilarityStrategy`] which stored tasks resemble
//! the current one. The default is plain keyword overlap; it carries no
//! semantic understanding and an embedding-based strategy can replace it
//! without touching the workflow.

use std::collections::HashSet;

use crate::constants::store::MAX_PATTERN_KEYWORDS;

/// Decides whether a stored task is similar to the current task
pub trait SimilarityStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Terms extracted from a task description
    fn keywords(&self, text: &str) -> Vec<String>;

    /// Similarity in `[0.0, 1.0]`; zero means unrelated
    fn similarity(&self, keywords: &[String], candidate: &str) -> f64;

    fn is_similar(&self, keywords: &[String], candidate: &str) -> bool {
        self.similarity(keywords, candidate) > 0.0
    }
}

/// Keyword overlap: share of query keywords found in the candidate text
#[derive(Debug, Clone, Default)]
pub struct KeywordOverlapSimilarity;

impl KeywordOverlapSimilarity {
    const STOP_WORDS: &'static [&'static str] =
        &["a", "an", "the", "in", "on", "at", "for", "to", "of", "and", "or"];

    const MIN_KEYWORD_LEN: usize = 4;
}

impl SimilarityStrategy for KeywordOverlapSimilarity {
    fn name(&self) -> &'static str {
        "keyword-overlap"
    }

    fn keywords(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        text.to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| w.chars().count() >= Self::MIN_KEYWORD_LEN)
            .filter(|w| !Self::STOP_WORDS.contains(w))
            .filter(|w| seen.insert(w.to_string()))
            .take(MAX_PATTERN_KEYWORDS)
            .map(String::from)
            .collect()
    }

    fn similarity(&self, keywords: &[String], candidate: &str) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }
        let candidate = candidate.to_lowercase();
        let hits = keywords
            .iter()
            .filter(|k| candidate.contains(k.as_str()))
            .count();
        hits as f64 / keywords.len() as f64
    }
}
