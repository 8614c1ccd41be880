//! Runtime Context
//!
//! Process-wide collaborators, constructed once and passed by reference:
//! gateway, knowledge store, search, scorer, metrics and config.
//!
//! The gateway is mandatory. The store and search degrade to `None` with a
//! warning when they cannot be set up, and the stages that need them skip.
//! A deployer is attached only by embedders through [`RuntimeContext::with_deployer`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{HeuristicScorer, LlmScorer, SharedScorer};
use crate::ai::metrics::{SharedMetrics, create_shared_metrics};
use crate::ai::provider::{SharedProvider, api_key_from_env, create_provider};
use crate::ai::timeout::TimeoutConfig;
use crate::collaborators::SharedDeployer;
use crate::config::{Config, ScoringMode, StorageConfig};
use crate::search::{SharedSearch, TavilySearch};
use crate::storage::{Database, KnowledgeStore, PoolConfig, SharedKnowledgeStore};
use crate::types::Result;

pub struct RuntimeContext {
    pub config: Config,
    pub provider: SharedProvider,
    pub store: Option<SharedKnowledgeStore>,
    pub search: Option<SharedSearch>,
    pub scorer: SharedScorer,
    pub metrics: SharedMetrics,
    pub deployer: Option<SharedDeployer>,
}

impl RuntimeContext {
    /// Context with only the mandatory collaborators
    pub fn new(config: Config, provider: SharedProvider, scorer: SharedScorer) -> Self {
        Self {
            config,
            provider,
            store: None,
            search: None,
            scorer,
            metrics: create_shared_metrics(uuid::Uuid::new_v4().to_string()),
            deployer: None,
        }
    }

    pub fn with_store(mut self, store: SharedKnowledgeStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_search(mut self, search: SharedSearch) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Publish persisted artifacts and link the resulting URL to the pattern
    pub fn with_deployer(mut self, deployer: SharedDeployer) -> Self {
        self.deployer = Some(deployer);
        self
    }

    /// Build every collaborator from configuration.
    ///
    /// Fails only when the LLM gateway cannot be constructed.
    pub fn from_config(config: Config) -> Result<Self> {
        let metrics = create_shared_metrics(uuid::Uuid::new_v4().to_string());
        let timeouts = TimeoutConfig::from_config(&config);
        let provider = create_provider(&config.llm, timeouts.llm_request, Some(metrics.clone()))?;

        let scorer: SharedScorer = match config.scoring.mode {
            ScoringMode::Llm => Arc::new(
                LlmScorer::new(provider.clone(), config.scoring.model.clone())
                    .with_metrics(metrics.clone()),
            ),
            ScoringMode::Heuristic => Arc::new(HeuristicScorer),
        };

        let store = open_store(&config.storage);
        let search = build_search(&config);

        info!(
            store = store.is_some(),
            search = search.is_some(),
            scoring = %config.scoring.mode,
            "Runtime context ready"
        );

        Ok(Self {
            config,
            provider,
            store,
            search,
            scorer,
            metrics,
            deployer: None,
        })
    }

    /// Knowledge store, or a storage error for commands that cannot run without it
    pub fn require_store(&self) -> Result<&SharedKnowledgeStore> {
        self.store.as_ref().ok_or_else(|| {
            crate::types::SwarmError::Storage(format!(
                "knowledge store unavailable at {}",
                self.config.storage.path.display()
            ))
        })
    }
}

/// Open and migrate the knowledge store; `None` with a warning on failure
pub fn open_store(config: &StorageConfig) -> Option<SharedKnowledgeStore> {
    let pool = PoolConfig {
        max_size: config.pool_size,
        connection_timeout_secs: config.connection_timeout_secs,
    };
    let opened = Database::open_with_config(&config.path, pool).and_then(|db| {
        db.initialize()?;
        Ok(db)
    });
    match opened {
        Ok(db) => Some(Arc::new(KnowledgeStore::new(Arc::new(db)))),
        Err(e) => {
            warn!(
                path = %config.path.display(),
                "Knowledge store unavailable, continuing without it: {}", e
            );
            None
        }
    }
}

fn build_search(config: &Config) -> Option<SharedSearch> {
    if !config.search.enabled {
        info!("Documentation search disabled");
        return None;
    }

    let Some(api_key) = api_key_from_env(&config.search.api_key_env) else {
        warn!(
            "{} not set, continuing without documentation search",
            config.search.api_key_env
        );
        return None;
    };

    let timeouts = TimeoutConfig::from_config(config);
    match TavilySearch::new(&config.search.base_url, api_key, timeouts.search) {
        Ok(search) => Some(Arc::new(search)),
        Err(e) => {
            warn!("Search client unavailable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SwarmError;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_creates_database() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig {
            path: temp.path().join("nested").join("knowledge.db"),
            ..StorageConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.pattern_count().unwrap(), 0);
        assert!(config.path.exists());
    }

    #[test]
    fn test_open_store_degrades_to_none() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let config = StorageConfig {
            path: blocker.join("knowledge.db"),
            ..StorageConfig::default()
        };
        assert!(open_store(&config).is_none());
    }

    #[test]
    fn test_missing_llm_key_is_fatal() {
        let mut config = Config::default();
        config.llm.api_key_env = "CODESWARM_TEST_MISSING_LLM_KEY".to_string();
        let result = RuntimeContext::from_config(config);
        assert!(matches!(result, Err(SwarmError::Validation(_))));
    }

    #[test]
    fn test_search_disabled_or_keyless_is_none() {
        let mut config = Config::default();
        config.search.enabled = false;
        assert!(build_search(&config).is_none());

        let mut config = Config::default();
        config.search.api_key_env = "CODESWARM_TEST_MISSING_SEARCH_KEY".to_string();
        assert!(build_search(&config).is_none());
    }

    struct OfflineProvider;

    #[async_trait::async_trait]
    impl crate::ai::provider::LlmProvider for OfflineProvider {
        async fn complete(
            &self,
            _request: &crate::ai::provider::CompletionRequest,
        ) -> Result<crate::ai::provider::LlmResponse> {
            Err(SwarmError::provider(crate::types::ErrorCategory::Network, "offline"))
        }

        fn name(&self) -> &str {
            "offline"
        }
    }

    #[test]
    fn test_require_store_without_store() {
        let context = RuntimeContext::new(
            Config::default(),
            Arc::new(OfflineProvider),
            Arc::new(HeuristicScorer),
        );
        assert!(matches!(context.require_store(), Err(SwarmError::Storage(_))));
        assert!(context.search.is_none());
    }
}
