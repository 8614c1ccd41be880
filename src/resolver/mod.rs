//! Documentation Resolver
//!
//! Three-tier lookup, merged in priority order with URL de-duplication
//! (first occurrence wins):
//!
//! 1. **Proven**: effectiveness-ranked docs from similar high-score patterns
//! 2. **Cached**: search cache entry for the task's query
//! 3. **Fresh**: live search, only while fewer than `max_results` docs are gathered
//!
//! The negative-feedback deny-list filters every tier. Tier failures are
//! logged and contribute nothing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ai::metrics::SharedMetrics;
use crate::ai::retry::{RetryPolicy, with_retry};
use crate::ai::timeout::TimeoutConfig;
use crate::config::Config;
use crate::search::{SharedSearch, documentation_query};
use crate::storage::{KeywordOverlapSimilarity, SharedKnowledgeStore, SimilarityStrategy};
use crate::types::{DocTier, ResolvedDoc, SearchResult};

/// Resolver tuning, taken from the `[documentation]` and `[quality]` config sections
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub cache_ttl_days: i64,
    pub search_timeout: Duration,
    pub min_samples: usize,
    pub threshold: f64,
    pub negative_rate: f64,
    pub min_uses: u32,
}

impl From<&Config> for ResolverSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache_ttl_days: config.documentation.cache_ttl_days,
            search_timeout: TimeoutConfig::from_config(config).search,
            min_samples: config.documentation.min_samples,
            threshold: config.quality.threshold,
            negative_rate: config.documentation.negative_rate,
            min_uses: config.documentation.min_uses,
        }
    }
}

/// Ordered, de-duplicated, deny-list-filtered accumulator
struct DocMerger<'a> {
    excluded: &'a HashSet<String>,
    seen: HashSet<String>,
    docs: Vec<ResolvedDoc>,
    limit: usize,
}

impl<'a> DocMerger<'a> {
    fn new(excluded: &'a HashSet<String>, limit: usize) -> Self {
        Self {
            excluded,
            seen: HashSet::new(),
            docs: Vec::new(),
            limit,
        }
    }

    fn is_full(&self) -> bool {
        self.docs.len() >= self.limit
    }

    fn extend(&mut self, results: impl IntoIterator<Item = SearchResult>, tier: DocTier) {
        for result in results {
            if self.is_full() {
                return;
            }
            if self.excluded.contains(&result.url) {
                debug!(url = %result.url, "Skipping excluded document");
                continue;
            }
            if self.seen.insert(result.url.clone()) {
                self.docs.push(ResolvedDoc { result, tier });
            }
        }
    }
}

pub struct DocumentationResolver {
    store: Option<SharedKnowledgeStore>,
    search: Option<SharedSearch>,
    similarity: Arc<dyn SimilarityStrategy>,
    settings: ResolverSettings,
    metrics: Option<SharedMetrics>,
}

impl DocumentationResolver {
    pub fn new(
        store: Option<SharedKnowledgeStore>,
        search: Option<SharedSearch>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            search,
            similarity: Arc::new(KeywordOverlapSimilarity),
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityStrategy>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Whether any tier can produce documents
    pub fn is_available(&self) -> bool {
        self.store.is_some() || self.search.is_some()
    }

    /// Resolve up to `max_results` documents for `task`
    pub async fn resolve(&self, task: &str, max_results: usize) -> Vec<ResolvedDoc> {
        if max_results == 0 {
            return Vec::new();
        }

        let query = documentation_query(task);
        let excluded = self.excluded_docs();
        let mut merger = DocMerger::new(&excluded, max_results);

        merger.extend(self.proven_tier(task, max_results), DocTier::Proven);
        if !merger.is_full() {
            merger.extend(self.cached_tier(&query).await, DocTier::Cached);
        }
        if merger.is_full() {
            debug!("Enough documents from proven and cached tiers, skipping search");
        } else {
            merger.extend(self.fresh_tier(&query, max_results).await, DocTier::Fresh);
        }

        info!(
            count = merger.docs.len(),
            proven = merger.docs.iter().filter(|d| d.tier == DocTier::Proven).count(),
            "Resolved documentation"
        );
        merger.docs
    }

    fn excluded_docs(&self) -> HashSet<String> {
        let Some(store) = &self.store else {
            return HashSet::new();
        };
        match store.excluded_docs(self.settings.negative_rate, self.settings.min_uses) {
            Ok(excluded) => {
                if !excluded.is_empty() {
                    debug!("{} documents excluded by negative feedback", excluded.len());
                }
                excluded
            }
            Err(e) => {
                warn!("Failed to load excluded documents: {}", e);
                HashSet::new()
            }
        }
    }

    fn proven_tier(&self, task: &str, limit: usize) -> Vec<SearchResult> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.proven_docs_for_task(
            task,
            self.similarity.as_ref(),
            limit,
            self.settings.min_samples,
            self.settings.threshold,
        ) {
            Ok(docs) => docs
                .into_iter()
                .map(|d| SearchResult {
                    relevance_score: d.avg_score / 100.0,
                    ..SearchResult::new(d.url, d.title)
                })
                .collect(),
            Err(e) => {
                warn!("Proven documentation lookup failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn cached_tier(&self, query: &str) -> Vec<SearchResult> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.get_cached_search_results(query) {
            Ok(Some(results)) => {
                debug!(query, count = results.len(), "Search cache hit");
                if let Some(metrics) = &self.metrics {
                    metrics.record_cache_hit();
                }
                let seen = with_retry("cached documents update", &RetryPolicy::storage(), || async {
                    store.record_documents_seen(&results)
                })
                .await;
                if let Err(e) = seen {
                    warn!("Failed to record cached documents: {}", e);
                }
                results
            }
            Ok(None) => {
                debug!(query, "Search cache miss");
                if let Some(metrics) = &self.metrics {
                    metrics.record_cache_miss();
                }
                Vec::new()
            }
            Err(e) => {
                warn!("Search cache read failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn fresh_tier(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let Some(search) = &self.search else {
            debug!("No search provider configured, skipping fresh tier");
            return Vec::new();
        };

        let policy = RetryPolicy::search(self.settings.search_timeout);
        let results = match with_retry("documentation search", &policy, || {
            search.search(query, max_results)
        })
        .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(provider = search.name(), "Documentation search failed: {}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure();
                }
                return Vec::new();
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_search();
        }

        if let Some(store) = &self.store {
            let ttl = self.settings.cache_ttl_days;
            let cached = with_retry("search cache write", &RetryPolicy::storage(), || async {
                store.cache_search_results(query, &results, ttl)?;
                store.record_documents_seen(&results)
            })
            .await;
            if let Err(e) = cached {
                warn!("Failed to cache search results: {}", e);
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchProvider;
    use crate::storage::{Database, KnowledgeStore, NewPattern};
    use crate::types::{AgentOutput, AgentRole, Result, UserFeedback};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockSearch {
        urls: Vec<&'static str>,
        calls: AtomicU32,
    }

    impl MockSearch {
        fn new(urls: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                urls,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl SearchProvider for MockSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .urls
                .iter()
                .take(max_results)
                .map(|u| SearchResult::new(*u, format!("Doc {}", u)))
                .collect())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn settings() -> ResolverSettings {
        ResolverSettings::from(&Config::default())
    }

    fn store() -> SharedKnowledgeStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        Arc::new(KnowledgeStore::new(Arc::new(db)))
    }

    fn persist(store: &KnowledgeStore, task: &str, urls: &[&str]) -> crate::types::PatternId {
        let outputs = vec![AgentOutput {
            role: AgentRole::Implementation,
            content: "code".to_string(),
            score: 95.0,
            feedback: String::new(),
            iterations: 1,
            latency_ms: 1,
            tokens_used: 1,
        }];
        let docs: Vec<SearchResult> = urls.iter().map(|u| SearchResult::new(*u, "t")).collect();
        store
            .store_pattern(
                NewPattern {
                    task,
                    outputs: &outputs,
                    avg_score: 95.0,
                    docs: &docs,
                },
                90.0,
            )
            .unwrap()
            .unwrap()
    }

    fn urls(docs: &[ResolvedDoc]) -> Vec<&str> {
        docs.iter().map(|d| d.url()).collect()
    }

    #[tokio::test]
    async fn test_proven_then_fresh_deduplicates() {
        let store = store();
        persist(&store, "login page react", &["https://a.dev", "https://b.dev"]);
        persist(&store, "login page vue", &["https://a.dev", "https://b.dev"]);

        let search = MockSearch::new(vec!["https://b.dev", "https://c.dev"]);
        let resolver = DocumentationResolver::new(Some(store), Some(search.clone()), settings());

        let docs = resolver.resolve("create a login page", 3).await;

        assert_eq!(urls(&docs), vec!["https://a.dev", "https://b.dev", "https://c.dev"]);
        assert_eq!(docs[0].tier, DocTier::Proven);
        assert_eq!(docs[1].tier, DocTier::Proven);
        assert_eq!(docs[2].tier, DocTier::Fresh);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_search_skipped_when_enough_proven() {
        let store = store();
        persist(&store, "login page react", &["https://a.dev", "https://b.dev"]);
        persist(&store, "login page vue", &["https://a.dev", "https://b.dev"]);

        let search = MockSearch::new(vec!["https://c.dev"]);
        let resolver = DocumentationResolver::new(Some(store), Some(search.clone()), settings());

        let docs = resolver.resolve("create a login page", 2).await;

        assert_eq!(urls(&docs), vec!["https://a.dev", "https://b.dev"]);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_resolution_hits_cache() {
        let store = store();
        let search = MockSearch::new(vec!["https://a.dev", "https://b.dev"]);
        let metrics = crate::ai::metrics::create_shared_metrics("resolver");
        let resolver = DocumentationResolver::new(Some(store.clone()), Some(search.clone()), settings())
            .with_metrics(metrics.clone());

        let first = resolver.resolve("build a react dashboard", 2).await;
        let second = resolver.resolve("Build a React   dashboard", 2).await;

        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert!(first.iter().all(|d| d.tier == DocTier::Fresh));
        assert!(second.iter().all(|d| d.tier == DocTier::Cached));
        assert_eq!(urls(&first), urls(&second));

        let summary = metrics.summary();
        assert_eq!(summary.cache_hits, 1);
        assert_eq!(summary.cache_misses, 1);
        assert_eq!(summary.searches, 1);

        // Seen documents are recorded without counting a use
        let node = store.get_documentation("https://a.dev").unwrap().unwrap();
        assert_eq!(node.total_uses, 0);
    }

    #[tokio::test]
    async fn test_cache_hit_refreshes_documentation() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.initialize().unwrap();
        let store = Arc::new(KnowledgeStore::new(db.clone()));
        let search = MockSearch::new(vec!["https://react.dev/hooks", "https://react.dev/state"]);
        let resolver = DocumentationResolver::new(Some(store.clone()), Some(search.clone()), settings());

        resolver.resolve("react hooks", 2).await;
        let before = store.get_documentation("https://react.dev/hooks").unwrap().unwrap();
        db.execute(
            "DELETE FROM documentation WHERE url = ?1",
            &[&"https://react.dev/state"],
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let second = resolver.resolve("react hooks", 2).await;
        assert!(second.iter().all(|d| d.tier == DocTier::Cached));
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);

        let after = store.get_documentation("https://react.dev/hooks").unwrap().unwrap();
        let parse = |ts: &str| chrono::DateTime::parse_from_rfc3339(ts).unwrap();
        assert_eq!(after.first_seen, before.first_seen);
        assert!(parse(&after.last_seen) > parse(&before.last_seen));
        assert_eq!(after.total_uses, 0);

        // Reuse from cache re-creates a node that was removed
        assert!(store.get_documentation("https://react.dev/state").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_excluded_docs_filtered_from_every_tier() {
        let store = store();
        let pattern = persist(&store, "payment form", &["https://bad.dev"]);
        let mut feedback = UserFeedback::new(pattern, 1, 1);
        feedback.unhelpful_docs = vec!["https://bad.dev".to_string()];
        store.store_user_feedback(&feedback).unwrap();

        let search = MockSearch::new(vec!["https://bad.dev", "https://good.dev"]);
        let resolver = DocumentationResolver::new(
            Some(store),
            Some(search),
            ResolverSettings {
                min_uses: 1,
                ..settings()
            },
        );

        let docs = resolver.resolve("payment form", 5).await;
        assert_eq!(urls(&docs), vec!["https://good.dev"]);
    }

    #[tokio::test]
    async fn test_search_only_without_store() {
        let search = MockSearch::new(vec!["https://a.dev", "https://b.dev", "https://c.dev"]);
        let resolver = DocumentationResolver::new(None, Some(search), settings());

        let docs = resolver.resolve("oauth flow", 2).await;
        assert_eq!(urls(&docs), vec!["https://a.dev", "https://b.dev"]);
    }

    #[tokio::test]
    async fn test_no_collaborators_resolves_nothing() {
        let resolver = DocumentationResolver::new(None, None, settings());
        assert!(!resolver.is_available());
        assert!(resolver.resolve("anything", 5).await.is_empty());
    }
}
