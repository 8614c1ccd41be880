//! Tavily Search Provider
//!
//! REST client for `POST /search`. Advanced depth, no raw page content.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::SearchProvider;
use crate::constants::network;
use crate::types::{ErrorCategory, ErrorClassifier, ProviderError, Result, SearchResult};

const PROVIDER_NAME: &str = "tavily";

pub struct TavilySearch {
    api_key: SecretString,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TavilySearch {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                ProviderError::with_provider(
                    ErrorCategory::Unknown,
                    format!("Failed to create HTTP client: {}", e),
                    PROVIDER_NAME,
                )
            })?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        info!("Searching documentation: '{}'", query);

        let url = format!("{}/search", self.base_url);
        let payload = SearchRequest {
            query,
            search_depth: "advanced",
            max_results,
            include_answer: false,
            include_raw_content: false,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, PROVIDER_NAME))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = ErrorClassifier::retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                retry_after,
                &format!("search returned {}: {}", status, body),
                PROVIDER_NAME,
            )
            .into());
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, PROVIDER_NAME))?;

        let results: Vec<SearchResult> = body
            .results
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .take(max_results)
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                content: r.content,
                relevance_score: r.score,
            })
            .collect();

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let body: SearchResponse = serde_json::from_str(
            r#"{
                "query": "react login documentation tutorial",
                "answer": null,
                "results": [
                    {"title": "Auth", "url": "https://react.dev/learn", "content": "...", "score": 0.91},
                    {"title": "No url", "content": "dropped"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(body.results.len(), 2);
        assert_eq!(body.results[0].score, 0.91);
        assert!(body.results[1].url.is_empty());
    }

    #[test]
    fn test_request_payload() {
        let payload = serde_json::to_value(SearchRequest {
            query: "q",
            search_depth: "advanced",
            max_results: 5,
            include_answer: false,
            include_raw_content: false,
        })
        .unwrap();
        assert_eq!(payload["max_results"], 5);
        assert_eq!(payload["search_depth"], "advanced");
    }
}
