//! codeswarm - Quality-Gated Multi-Agent Code Generation
//!
//! Coordinates several LLM agents to produce a software artifact. Every
//! agent output is scored, and runs that clear the quality threshold are
//! stored in a knowledge store so later runs can reuse their patterns and
//! the documentation that helped.
//!
//! ## Core Features
//!
//! - **Quality Loop**: each agent re-prompts with scorer feedback until the threshold is met
//! - **Workflow Gate**: underperforming agents rerun; only high-scoring patterns persist
//! - **Three-Tier Documentation**: proven docs, search cache, then live search
//! - **Negative Feedback**: user-flagged documents drop out of future runs
//!
//! ## Quick Start
//!
//! ```ignore
//! use codeswarm::{ConfigLoader, RuntimeContext, WorkflowEngine, WorkflowOptions};
//!
//! let ctx = RuntimeContext::from_config(ConfigLoader::load()?)?;
//! let engine = WorkflowEngine::new(&ctx)?;
//! let result = engine.run("create a login page", &WorkflowOptions::default()).await?;
//! println!("{}", result.synthesized());
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: LLM gateway, retry combinator, timeouts, metrics
//! - [`agents`]: role configs, prompts, scorers, the per-agent quality loop
//! - [`resolver`]: three-tier documentation resolution
//! - [`search`]: external documentation search
//! - [`storage`]: SQLite knowledge store with connection pooling
//! - [`workflow`]: the stage sequence and quality gate
//! - [`config`]: layered configuration

pub mod agents;
pub mod ai;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod context;
pub mod resolver;
pub mod search;
pub mod storage;
pub mod types;
pub mod workflow;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, ScoringMode};

// Error Types
pub use types::error::{ErrorCategory, ProviderError, Result, ResultExt, SwarmError};

// Runtime
pub use context::RuntimeContext;

// Storage
pub use storage::{Database, KnowledgeStore, SharedKnowledgeStore};

// =============================================================================
// Workflow Re-exports
// =============================================================================

pub use workflow::{WorkflowEngine, WorkflowOptions, WorkflowResult};

pub use agents::{AgentExecutor, HeuristicScorer, LlmScorer, Scorer};
pub use resolver::DocumentationResolver;

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    LlmProvider, LlmResponse, MetricsCollector, RetryPolicy, SharedMetrics, SharedProvider,
    TimeoutConfig, with_retry, with_timeout,
};
