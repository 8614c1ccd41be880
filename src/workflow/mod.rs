//! Workflow Engine
//!
//! Top-level state machine for one generation run:
//!
//! 1. Pattern retrieval: similar stored patterns as few-shot context
//! 2. Documentation: three-tier resolver
//! 3. Vision (conditional): design description from an image or visual task
//! 4. Architecture
//! 5. Implementation and Security, concurrently
//! 6. Testing
//! 7. Synthesis: average score over the code roles
//! 8. Gate: persist at or above threshold, otherwise rerun underperformers
//! 9. Deployment (optional): publish the persisted artifact, link its URL
//!
//! Stages whose collaborator is missing or failing are skipped and recorded.
//! Deployment is opt-in, so running without a deployer records no skip.

pub mod types;

pub use types::{GateDecision, SkippedStage, Stage, WorkflowResult, average_code_score};

use types::synthesize;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::agents::{AgentContext, AgentExecutor, PreviousAttempt, QualitySettings, VisionTrigger};
use crate::ai::retry::{RetryPolicy, with_retry};
use crate::collaborators::extract_files;
use crate::constants::task::MAX_TASK_LEN;
use crate::context::RuntimeContext;
use crate::resolver::{DocumentationResolver, ResolverSettings};
use crate::storage::{KeywordOverlapSimilarity, NewPattern, SimilarityStrategy};
use crate::types::{
    AgentOutput, AgentRole, PatternId, PatternRecord, ResolvedDoc, Result, SearchResult,
    SwarmError, ValidationErrorKind,
};

/// Per-run inputs beyond the task text
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    /// Image reference for the vision stage
    pub image: Option<String>,
}

pub struct WorkflowEngine<'a> {
    ctx: &'a RuntimeContext,
    executor: AgentExecutor,
    resolver: DocumentationResolver,
    vision: VisionTrigger,
    similarity: Arc<dyn SimilarityStrategy>,
}

/// Mutable state threaded through one run
#[derive(Default)]
struct RunState {
    skipped: Vec<SkippedStage>,
    outputs: BTreeMap<AgentRole, AgentOutput>,
}

impl RunState {
    fn skip(&mut self, stage: Stage, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(stage = %stage, "Stage skipped: {}", reason);
        self.skipped.push(SkippedStage { stage, reason });
    }
}

impl<'a> WorkflowEngine<'a> {
    pub fn new(ctx: &'a RuntimeContext) -> Result<Self> {
        let executor = AgentExecutor::new(ctx.provider.clone(), ctx.scorer.clone())
            .with_metrics(ctx.metrics.clone());
        let similarity: Arc<dyn SimilarityStrategy> = Arc::new(KeywordOverlapSimilarity);
        let resolver = DocumentationResolver::new(
            ctx.store.clone(),
            ctx.search.clone(),
            ResolverSettings::from(&ctx.config),
        )
        .with_metrics(ctx.metrics.clone())
        .with_similarity(similarity.clone());

        Ok(Self {
            ctx,
            executor,
            resolver,
            vision: VisionTrigger::new()?,
            similarity,
        })
    }

    /// Replace the task-similarity strategy for pattern retrieval and proven docs
    pub fn with_similarity(mut self, similarity: Arc<dyn SimilarityStrategy>) -> Self {
        self.resolver = self.resolver.with_similarity(similarity.clone());
        self.similarity = similarity;
        self
    }

    fn finish_stage(&self, stage: Stage, started: Instant, state: &RunState) {
        self.ctx
            .metrics
            .complete_stage(stage.as_str(), started, state.was_skipped(stage));
    }

    fn quality(&self) -> QualitySettings {
        QualitySettings::from(&self.ctx.config.quality)
    }

    pub async fn run(&self, task: &str, options: &WorkflowOptions) -> Result<WorkflowResult> {
        let started = Instant::now();
        let task = validate_task(task)?;
        let threshold = self.ctx.config.quality.threshold;
        let mut state = RunState::default();

        info!(threshold, "Starting workflow for task: {}", crate::types::excerpt(task, 80));

        // Stage 1: similar patterns
        let stage_start = Instant::now();
        let patterns = self.retrieve_patterns(task, &mut state);
        self.finish_stage(Stage::PatternRetrieval, stage_start, &state);

        // Stage 2: documentation
        let stage_start = Instant::now();
        let docs = self.resolve_documentation(task, &mut state).await;
        self.finish_stage(Stage::Documentation, stage_start, &state);

        let mut base = AgentContext {
            patterns,
            docs,
            image: options.image.clone(),
            ..AgentContext::default()
        };

        // Stage 3: vision
        let stage_start = Instant::now();
        if self.vision.should_run(task, options.image.as_deref()) {
            info!("Stage: vision analysis");
            if let Some(output) = self.run_agent(task, AgentRole::Vision, &base, &mut state).await {
                base.design = Some(output.content.clone());
                state.outputs.insert(AgentRole::Vision, output);
            }
            self.finish_stage(Stage::Vision, stage_start, &state);
        } else {
            debug!("No visual cues in task, vision stage not applicable");
        }

        // Stage 4: architecture
        info!("Stage: architecture");
        self.run_stage(task, AgentRole::Architecture, &base, &mut state).await;

        // Stage 5: implementation and security share the architecture snapshot
        info!("Stage: implementation + security");
        let stage_start = Instant::now();
        let impl_ctx = context_for(AgentRole::Implementation, &base, &state.outputs);
        let sec_ctx = context_for(AgentRole::Security, &base, &state.outputs);
        let quality = self.quality();
        let (implementation, security) = tokio::join!(
            self.executor.execute(task, AgentRole::Implementation, &impl_ctx, quality),
            self.executor.execute(task, AgentRole::Security, &sec_ctx, quality),
        );
        for (role, result) in [
            (AgentRole::Implementation, implementation),
            (AgentRole::Security, security),
        ] {
            self.accept_agent_result(role, result, &mut state);
            self.finish_stage(Stage::for_role(role), stage_start, &state);
        }

        // Stage 6: testing
        info!("Stage: testing");
        self.run_stage(task, AgentRole::Testing, &base, &mut state).await;

        // Stage 7: synthesis
        let mut avg_score = average_code_score(&state.outputs).ok_or_else(|| {
            SwarmError::Workflow("no code agent produced output".to_string())
        })?;
        info!(avg_score, "Synthesized {} agent outputs", state.outputs.len());

        // Stage 8: gate
        let max_gate = self.ctx.config.quality.workflow_max_iterations.max(1);
        let mut gate_iterations = 1;
        while GateDecision::evaluate(avg_score, threshold) == GateDecision::Retry {
            if gate_iterations >= max_gate {
                warn!(
                    avg_score,
                    threshold, "Gate cap of {} reached below threshold", max_gate
                );
                break;
            }
            gate_iterations += 1;
            info!(
                gate = gate_iterations,
                avg_score, "Below threshold, rerunning underperforming agents"
            );
            self.rerun_underperformers(task, &base, threshold, &mut state).await;
            if let Some(avg) = average_code_score(&state.outputs) {
                avg_score = avg;
            }
        }

        let below_threshold = avg_score < threshold;
        let doc_results: Vec<SearchResult> = base.docs.iter().map(|d| d.result.clone()).collect();
        let pattern_id = self.persist(task, avg_score, &doc_results, &mut state).await;
        let deployment_url = match &pattern_id {
            Some(id) => self.deploy(id, &mut state).await,
            None => None,
        };
        self.record_agent_runs(&state.outputs);

        let result = WorkflowResult {
            task: task.to_string(),
            avg_score,
            pattern_persisted: pattern_id.is_some(),
            pattern_id,
            below_threshold,
            gate_iterations,
            doc_urls: doc_results.into_iter().map(|d| d.url).collect(),
            similar_patterns: base.patterns.len(),
            deployment_url,
            duration_ms: started.elapsed().as_millis() as u64,
            outputs: state.outputs,
            skipped_stages: state.skipped,
        };

        info!(
            avg_score = result.avg_score,
            persisted = result.pattern_persisted,
            gate_iterations = result.gate_iterations,
            "Workflow completed in {}ms",
            result.duration_ms
        );
        Ok(result)
    }

    fn retrieve_patterns(&self, task: &str, state: &mut RunState) -> Vec<PatternRecord> {
        let Some(store) = &self.ctx.store else {
            state.skip(Stage::PatternRetrieval, "knowledge store unavailable");
            return Vec::new();
        };

        let retrieval = &self.ctx.config.retrieval;
        match store.retrieve_similar_patterns(
            task,
            retrieval.pattern_limit,
            retrieval.min_pattern_score,
            self.similarity.as_ref(),
        ) {
            Ok(patterns) => {
                if patterns.is_empty() {
                    debug!("No similar patterns found");
                } else {
                    info!("Retrieved {} similar patterns", patterns.len());
                }
                patterns
            }
            Err(e) => {
                state.skip(Stage::PatternRetrieval, e.to_string());
                Vec::new()
            }
        }
    }

    async fn resolve_documentation(&self, task: &str, state: &mut RunState) -> Vec<ResolvedDoc> {
        if !self.resolver.is_available() {
            state.skip(Stage::Documentation, "no knowledge store or search provider");
            return Vec::new();
        }
        self.resolver
            .resolve(task, self.ctx.config.documentation.max_results)
            .await
    }

    /// Single-agent stage with metrics
    async fn run_stage(&self, task: &str, role: AgentRole, base: &AgentContext, state: &mut RunState) {
        let stage_start = Instant::now();
        let context = context_for(role, base, &state.outputs);
        if let Some(output) = self.run_agent(task, role, &context, state).await {
            state.outputs.insert(role, output);
        }
        self.finish_stage(Stage::for_role(role), stage_start, state);
    }

    async fn run_agent(
        &self,
        task: &str,
        role: AgentRole,
        context: &AgentContext,
        state: &mut RunState,
    ) -> Option<AgentOutput> {
        let result = self.executor.execute(task, role, context, self.quality()).await;
        match result {
            Ok(output) => Some(output),
            Err(e) => {
                state.skip(Stage::for_role(role), format!("{} agent produced no output: {}", role, e));
                None
            }
        }
    }

    fn accept_agent_result(&self, role: AgentRole, result: Result<AgentOutput>, state: &mut RunState) {
        match result {
            Ok(output) => {
                state.outputs.insert(role, output);
            }
            Err(e) => state.skip(
                Stage::for_role(role),
                format!("{} agent produced no output: {}", role, e),
            ),
        }
    }

    /// Rerun every code agent below threshold with its previous attempt in
    /// the prompt; each role keeps whichever attempt scored higher.
    async fn rerun_underperformers(
        &self,
        task: &str,
        base: &AgentContext,
        threshold: f64,
        state: &mut RunState,
    ) {
        let quality = self.quality();
        let reruns: Vec<(AgentRole, AgentContext)> = AgentRole::CODE_ROLES
            .iter()
            .filter_map(|role| state.outputs.get(role))
            .filter(|o| o.score < threshold)
            .map(|o| {
                let context = context_for(o.role, base, &state.outputs).with_previous(PreviousAttempt {
                    content: o.content.clone(),
                    score: o.score,
                    feedback: o.feedback.clone(),
                });
                (o.role, context)
            })
            .collect();

        let results = join_all(reruns.iter().map(|(role, context)| async move {
            (*role, self.executor.execute(task, *role, context, quality).await)
        }))
        .await;

        for (role, result) in results {
            match result {
                Ok(candidate) => {
                    let improved = state
                        .outputs
                        .get(&role)
                        .is_none_or(|current| candidate.score > current.score);
                    if improved {
                        info!(role = %role, score = candidate.score, "Rerun improved score");
                        state.outputs.insert(role, candidate);
                    } else {
                        debug!(role = %role, "Rerun did not improve, keeping previous attempt");
                    }
                }
                Err(e) => warn!(role = %role, "Rerun failed, keeping previous attempt: {}", e),
            }
        }
    }

    async fn persist(
        &self,
        task: &str,
        avg_score: f64,
        docs: &[SearchResult],
        state: &mut RunState,
    ) -> Option<PatternId> {
        let threshold = self.ctx.config.quality.threshold;
        if avg_score < threshold {
            debug!(avg_score, threshold, "Pattern not persisted below threshold");
            return None;
        }
        let Some(store) = &self.ctx.store else {
            state.skip(Stage::Persistence, "knowledge store unavailable");
            return None;
        };

        let stage_start = Instant::now();
        let outputs: Vec<AgentOutput> = state.outputs.values().cloned().collect();
        let stored = with_retry("pattern persistence", &RetryPolicy::storage(), || async {
            store.store_pattern(
                NewPattern {
                    task,
                    outputs: &outputs,
                    avg_score,
                    docs,
                },
                threshold,
            )
        })
        .await;

        let pattern_id = match stored {
            Ok(id) => {
                if id.is_some() {
                    self.ctx.metrics.record_pattern_stored();
                }
                id
            }
            Err(e) => {
                state.skip(Stage::Persistence, e.to_string());
                None
            }
        };
        self.finish_stage(Stage::Persistence, stage_start, state);
        pattern_id
    }

    /// Deploy the files of a persisted artifact and link the deployment URL
    async fn deploy(&self, pattern_id: &PatternId, state: &mut RunState) -> Option<String> {
        let Some(deployer) = &self.ctx.deployer else {
            debug!("No deployer configured, skipping deployment");
            return None;
        };
        let Some(store) = &self.ctx.store else {
            return None;
        };

        let stage_start = Instant::now();
        let files = extract_files(&synthesize(&state.outputs));
        let url = match deployer.deploy(&files).await {
            Ok(info) => match store.link_repository_url(pattern_id.as_str(), &info.url) {
                Ok(()) => {
                    info!(pattern_id = %pattern_id, url = %info.url, files = files.len(), "Deployed pattern");
                    Some(info.url)
                }
                Err(e) => {
                    state.skip(Stage::Deployment, format!("failed to link {}: {}", info.url, e));
                    None
                }
            },
            Err(e) => {
                state.skip(Stage::Deployment, e.to_string());
                None
            }
        };
        self.finish_stage(Stage::Deployment, stage_start, state);
        url
    }

    fn record_agent_runs(&self, outputs: &BTreeMap<AgentRole, AgentOutput>) {
        let Some(store) = &self.ctx.store else {
            return;
        };
        let threshold = self.ctx.config.quality.threshold;
        for output in outputs.values() {
            if let Err(e) =
                store.record_agent_run(output.role.as_str(), output.score, output.latency_ms, threshold)
            {
                warn!(role = %output.role, "Failed to record agent stats: {}", e);
            }
        }
    }
}

impl RunState {
    fn was_skipped(&self, stage: Stage) -> bool {
        self.skipped.iter().any(|s| s.stage == stage)
    }
}

/// Context for `role`: shared base plus the upstream outputs it consumes
fn context_for(
    role: AgentRole,
    base: &AgentContext,
    outputs: &BTreeMap<AgentRole, AgentOutput>,
) -> AgentContext {
    let upstream: &[AgentRole] = match role {
        AgentRole::Vision | AgentRole::Architecture => &[],
        AgentRole::Implementation | AgentRole::Security => &[AgentRole::Architecture],
        AgentRole::Testing => &[
            AgentRole::Architecture,
            AgentRole::Implementation,
            AgentRole::Security,
        ],
    };

    upstream
        .iter()
        .filter_map(|r| outputs.get(r))
        .fold(base.clone(), |ctx, o| ctx.with_upstream(o.role, o.content.clone()))
}

/// Trimmed task text; empty or oversized tasks are rejected
pub fn validate_task(task: &str) -> Result<&str> {
    let trimmed = task.trim();
    if trimmed.is_empty() {
        return Err(SwarmError::validation(
            ValidationErrorKind::MissingField,
            "task",
            "task description is empty",
        ));
    }
    let len = trimmed.chars().count();
    if len > MAX_TASK_LEN {
        return Err(SwarmError::validation(
            ValidationErrorKind::Range,
            "task",
            format!("task is {} characters, maximum is {}", len, MAX_TASK_LEN),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{QualityScore, ScoreRequest, Scorer};
    use crate::ai::provider::{
        CompletionRequest, LlmProvider, LlmResponse, ResponseMetadata, ResponseTiming, TokenUsage,
    };
    use crate::collaborators::{Deployer, DeploymentInfo};
    use crate::config::Config;
    use crate::search::SearchProvider;
    use crate::storage::{Database, KnowledgeStore, SharedKnowledgeStore};
    use crate::types::ErrorCategory;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Echoes the requested model; optionally always fails
    struct EchoProvider {
        calls: AtomicU32,
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl EchoProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn prompts_containing(&self, needle: &str) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.contains(needle))
                .count()
        }
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if self.fail {
                return Err(SwarmError::provider(ErrorCategory::Transient, "gateway down"));
            }
            Ok(LlmResponse {
                content: format!("output from {}", request.model),
                usage: TokenUsage::from_openai(10, 10),
                timing: ResponseTiming { latency_ms: 1 },
                metadata: ResponseMetadata::default(),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Per-role score scripts; the last entry repeats
    struct RoleScorer {
        scripts: HashMap<AgentRole, Vec<f64>>,
        default: f64,
        calls: Mutex<HashMap<AgentRole, usize>>,
    }

    impl RoleScorer {
        fn constant(score: f64) -> Arc<Self> {
            Self::scripted(score, HashMap::new())
        }

        fn scripted(default: f64, scripts: HashMap<AgentRole, Vec<f64>>) -> Arc<Self> {
            Arc::new(Self {
                scripts,
                default,
                calls: Mutex::new(HashMap::new()),
            })
        }
    }

    #[async_trait]
    impl Scorer for RoleScorer {
        async fn score(&self, request: &ScoreRequest<'_>) -> Result<QualityScore> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(request.role).or_insert(0);
                *n += 1;
                *n - 1
            };
            let score = self
                .scripts
                .get(&request.role)
                .and_then(|s| s.get(n).or(s.last()))
                .copied()
                .unwrap_or(self.default);
            Ok(QualityScore::new(score, format!("{} feedback {}", request.role, n + 1)))
        }

        fn name(&self) -> &str {
            "role"
        }
    }

    struct FiveDocSearch {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SearchProvider for FiveDocSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((1..=5)
                .take(max_results)
                .map(|i| SearchResult::new(format!("https://docs.dev/{}", i), format!("Doc {}", i)))
                .collect())
        }

        fn name(&self) -> &str {
            "five"
        }
    }

    fn store() -> SharedKnowledgeStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        Arc::new(KnowledgeStore::new(Arc::new(db)))
    }

    fn config(agent_iterations: u32) -> Config {
        let mut config = Config::default();
        config.quality.agent_max_iterations = agent_iterations;
        config
    }

    #[tokio::test]
    async fn test_end_to_end_login_page_then_cache_hit() {
        let store = store();
        let search = Arc::new(FiveDocSearch {
            calls: AtomicU32::new(0),
        });
        let ctx = RuntimeContext::new(config(3), EchoProvider::new(), RoleScorer::constant(94.0))
            .with_store(store.clone())
            .with_search(search.clone());
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let first = engine
            .run("create a login page", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.avg_score, 94.0);
        assert!(first.pattern_persisted);
        assert!(!first.below_threshold);
        assert_eq!(first.gate_iterations, 1);
        assert_eq!(first.doc_urls.len(), 5);
        assert_eq!(first.outputs.len(), 4);
        assert!(first.output(AgentRole::Vision).is_none());
        assert!(first.skipped_stages.is_empty());

        let pattern_id = first.pattern_id.clone().unwrap();
        assert_eq!(store.pattern_count().unwrap(), 1);
        assert_eq!(store.documentation_count().unwrap(), 5);
        let contributions = store.contributions_for_pattern(pattern_id.as_str()).unwrap();
        assert_eq!(contributions.len(), 5);
        assert!(contributions.iter().all(|c| c.score == 94.0));

        let second = engine
            .run("create a login page", &WorkflowOptions::default())
            .await
            .unwrap();
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.similar_patterns, 1);
        assert_eq!(second.doc_urls, first.doc_urls);
        assert_eq!(ctx.metrics.summary().cache_hits, 1);
        assert_eq!(ctx.metrics.summary().patterns_stored, 2);
    }

    struct NeverSimilar;

    impl SimilarityStrategy for NeverSimilar {
        fn name(&self) -> &'static str {
            "never"
        }

        fn keywords(&self, text: &str) -> Vec<String> {
            text.split_whitespace().map(String::from).collect()
        }

        fn similarity(&self, _keywords: &[String], _candidate: &str) -> f64 {
            0.0
        }
    }

    #[tokio::test]
    async fn test_custom_similarity_strategy_controls_retrieval() {
        let store = store();
        let ctx = RuntimeContext::new(config(1), EchoProvider::new(), RoleScorer::constant(95.0))
            .with_store(store.clone());
        let engine = WorkflowEngine::new(&ctx)
            .unwrap()
            .with_similarity(Arc::new(NeverSimilar));

        engine.run("create a login page", &WorkflowOptions::default()).await.unwrap();
        let second = engine
            .run("create a login page", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(store.pattern_count().unwrap(), 2);
        assert_eq!(second.similar_patterns, 0);
    }

    #[tokio::test]
    async fn test_gate_reruns_only_underperformers() {
        let provider = EchoProvider::new();
        let scorer = RoleScorer::scripted(
            95.0,
            HashMap::from([(AgentRole::Security, vec![60.0, 96.0])]),
        );
        let ctx = RuntimeContext::new(config(1), provider.clone(), scorer).with_store(store());
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("add oauth login", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(result.gate_iterations, 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
        assert_eq!(result.output(AgentRole::Security).unwrap().score, 96.0);
        assert_eq!(result.avg_score, 95.25);
        assert!(result.pattern_persisted);
        assert_eq!(provider.prompts_containing("Previous Attempt (score 60.0/100)"), 1);
        assert_eq!(provider.prompts_containing("security feedback 1"), 1);
    }

    #[tokio::test]
    async fn test_gate_cap_returns_best_below_threshold() {
        let provider = EchoProvider::new();
        let store = store();
        let ctx = RuntimeContext::new(config(1), provider.clone(), RoleScorer::constant(50.0))
            .with_store(store.clone());
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("build a rest api", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(result.gate_iterations, 3);
        assert!(result.below_threshold);
        assert!(!result.pattern_persisted);
        assert_eq!(result.avg_score, 50.0);
        // 4 agents, then 2 rerun passes of 4
        assert_eq!(provider.calls.load(Ordering::SeqCst), 12);
        assert_eq!(store.pattern_count().unwrap(), 0);
        assert_eq!(store.agent_stats().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_rerun_keeps_better_previous_attempt() {
        let scorer = RoleScorer::scripted(
            95.0,
            HashMap::from([(AgentRole::Testing, vec![70.0, 40.0])]),
        );
        let mut config = config(1);
        config.quality.workflow_max_iterations = 2;
        let ctx = RuntimeContext::new(config, EchoProvider::new(), scorer);
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("write a cli parser", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(result.output(AgentRole::Testing).unwrap().score, 70.0);
        assert_eq!(result.avg_score, 88.75);
        assert!(result.below_threshold);
    }

    #[tokio::test]
    async fn test_vision_stage_feeds_architecture() {
        let provider = EchoProvider::new();
        let scorer = RoleScorer::scripted(95.0, HashMap::from([(AgentRole::Vision, vec![10.0])]));
        let ctx = RuntimeContext::new(config(1), provider.clone(), scorer);
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("turn this mockup into a page", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(result.output(AgentRole::Vision).unwrap().score, 10.0);
        assert_eq!(result.avg_score, 95.0);
        assert!(!result.below_threshold);
        assert!(provider.prompts_containing("# Design Specification\n\noutput from openai/gpt-5") >= 1);
    }

    #[tokio::test]
    async fn test_missing_collaborators_are_skipped() {
        let ctx = RuntimeContext::new(config(1), EchoProvider::new(), RoleScorer::constant(95.0));
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("parse csv files", &WorkflowOptions::default())
            .await
            .unwrap();

        assert!(result.was_skipped(Stage::PatternRetrieval));
        assert!(result.was_skipped(Stage::Documentation));
        assert!(result.was_skipped(Stage::Persistence));
        assert!(!result.pattern_persisted);
        assert!(!result.below_threshold);
        assert!(result.doc_urls.is_empty());
    }

    /// Records deployments; optionally always fails
    struct RecordingDeployer {
        deployments: AtomicU32,
        fail: bool,
    }

    impl RecordingDeployer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                deployments: AtomicU32::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Deployer for RecordingDeployer {
        async fn deploy(&self, _files: &BTreeMap<String, String>) -> Result<DeploymentInfo> {
            let n = self.deployments.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(SwarmError::provider(ErrorCategory::Unavailable, "deploy target offline"));
            }
            Ok(DeploymentInfo {
                url: format!("https://github.com/acme/generated-{}", n),
            })
        }
    }

    #[tokio::test]
    async fn test_deployment_links_repository_url() {
        let store = store();
        let deployer = RecordingDeployer::new(false);
        let ctx = RuntimeContext::new(config(1), EchoProvider::new(), RoleScorer::constant(95.0))
            .with_store(store.clone())
            .with_deployer(deployer.clone());
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("create a signup form", &WorkflowOptions::default())
            .await
            .unwrap();

        assert_eq!(deployer.deployments.load(Ordering::SeqCst), 1);
        assert_eq!(result.deployment_url.as_deref(), Some("https://github.com/acme/generated-1"));
        assert!(!result.was_skipped(Stage::Deployment));

        let pattern = store
            .get_pattern(result.pattern_id.unwrap().as_str())
            .unwrap()
            .unwrap();
        assert_eq!(pattern.repository_url.as_deref(), Some("https://github.com/acme/generated-1"));
    }

    #[tokio::test]
    async fn test_deployment_failure_is_skipped_and_pattern_kept() {
        let store = store();
        let deployer = RecordingDeployer::new(true);
        let ctx = RuntimeContext::new(config(1), EchoProvider::new(), RoleScorer::constant(95.0))
            .with_store(store.clone())
            .with_deployer(deployer.clone());
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("create a signup form", &WorkflowOptions::default())
            .await
            .unwrap();

        assert!(result.pattern_persisted);
        assert!(result.was_skipped(Stage::Deployment));
        assert!(result.deployment_url.is_none());
        assert_eq!(store.pattern_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_deployment_below_threshold() {
        let deployer = RecordingDeployer::new(false);
        let ctx = RuntimeContext::new(config(1), EchoProvider::new(), RoleScorer::constant(50.0))
            .with_store(store())
            .with_deployer(deployer.clone());
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine
            .run("create a signup form", &WorkflowOptions::default())
            .await
            .unwrap();

        assert!(!result.pattern_persisted);
        assert!(result.deployment_url.is_none());
        assert_eq!(deployer.deployments.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_code_output_is_workflow_error() {
        let ctx = RuntimeContext::new(config(1), EchoProvider::failing(), RoleScorer::constant(95.0));
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let result = engine.run("anything", &WorkflowOptions::default()).await;
        assert!(matches!(result, Err(SwarmError::Workflow(_))));
    }

    #[tokio::test]
    async fn test_invalid_tasks_are_rejected() {
        let provider = EchoProvider::new();
        let ctx = RuntimeContext::new(config(1), provider.clone(), RoleScorer::constant(95.0));
        let engine = WorkflowEngine::new(&ctx).unwrap();

        let empty = engine.run("   \n", &WorkflowOptions::default()).await;
        assert!(matches!(empty, Err(SwarmError::Validation(_))));

        let long = "x".repeat(MAX_TASK_LEN + 1);
        let too_long = engine.run(&long, &WorkflowOptions::default()).await;
        assert!(matches!(too_long, Err(SwarmError::Validation(_))));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_context_for_wires_upstream() {
        let mut outputs = BTreeMap::new();
        for role in AgentRole::CODE_ROLES {
            outputs.insert(
                role,
                AgentOutput {
                    role,
                    content: format!("{} out", role),
                    score: 90.0,
                    feedback: String::new(),
                    iterations: 1,
                    latency_ms: 1,
                    tokens_used: 1,
                },
            );
        }
        let base = AgentContext::default();

        assert!(context_for(AgentRole::Architecture, &base, &outputs).upstream.is_empty());
        let security = context_for(AgentRole::Security, &base, &outputs);
        assert_eq!(security.upstream.keys().copied().collect::<Vec<_>>(), vec![AgentRole::Architecture]);
        let testing = context_for(AgentRole::Testing, &base, &outputs);
        assert_eq!(testing.upstream.len(), 3);
        assert!(!testing.upstream.contains_key(&AgentRole::Testing));
    }
}
