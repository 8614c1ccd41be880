//! External Documentation Search
//!
//! The [`SearchProvider`] trait is the seam the documentation resolver uses for
//! its fresh tier. [`TavilySearch`] is the HTTP implementation.
//!
//! Queries are built from the task text with [`documentation_query`]:
//! lowercase words minus stop-words, first five kept, followed by
//! `documentation tutorial`.

mod tavily;

pub use tavily::TavilySearch;

use std::sync::Arc;

use async_trait::async_trait;

use crate::constants::documentation::{QUERY_KEYWORDS, QUERY_SUFFIX};
use crate::types::{Result, SearchResult};

/// Live web search for documentation
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search and return at most `max_results` results
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

pub type SharedSearch = Arc<dyn SearchProvider + Send + Sync>;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "should", "could", "may",
    "might", "must", "i", "you", "he", "she", "it", "we", "they", "them", "their", "this",
    "that", "these", "those", "to", "from", "in", "on", "at", "for", "with", "about", "as",
    "by", "of", "make", "create", "build",
];

/// Search keywords from a task: lowercase, no stop-words, longer than 2 chars
pub fn search_keywords(task: &str) -> Vec<String> {
    task.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(String::from)
        .collect()
}

/// Documentation search query for a task
pub fn documentation_query(task: &str) -> String {
    let keywords = search_keywords(task);
    let head = keywords
        .iter()
        .take(QUERY_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    if head.is_empty() {
        QUERY_SUFFIX.to_string()
    } else {
        format!("{} {}", head, QUERY_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_skip_stop_words() {
        assert_eq!(
            search_keywords("Create a login page with OAuth"),
            vec!["login", "page", "oauth"]
        );
    }

    #[test]
    fn test_query_uses_first_five_keywords() {
        let query = documentation_query(
            "build react dashboard charts filters export pagination websocket",
        );
        assert_eq!(
            query,
            "react dashboard charts filters export documentation tutorial"
        );
    }

    #[test]
    fn test_query_for_stop_word_task() {
        assert_eq!(documentation_query("make it so"), "documentation tutorial");
    }
}
