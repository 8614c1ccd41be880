//! Agent Executor
//!
//! Wraps one agent's gateway calls in a quality-improvement loop:
//!
//! 1. Call the gateway with the role's static config
//! 2. Score the output
//! 3. Stop once the score reaches the threshold
//! 4. Otherwise re-prompt with the previous output and the scorer feedback
//!
//! The best-scoring attempt is returned; ties keep the earlier attempt.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::prompt::{feedback_prompt, render_prompt};
use super::scorer::{ScoreRequest, SharedScorer};
use super::AgentContext;
use crate::ai::metrics::SharedMetrics;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::config::QualityConfig;
use crate::types::{AgentOutput, AgentRole, Result, SwarmError};

/// Threshold and attempt budget for one executor call
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    pub threshold: f64,
    pub max_iterations: u32,
}

impl From<&QualityConfig> for QualitySettings {
    fn from(config: &QualityConfig) -> Self {
        Self {
            threshold: config.threshold,
            max_iterations: config.agent_max_iterations,
        }
    }
}

pub struct AgentExecutor {
    provider: SharedProvider,
    scorer: SharedScorer,
    metrics: Option<SharedMetrics>,
}

impl AgentExecutor {
    pub fn new(provider: SharedProvider, scorer: SharedScorer) -> Self {
        Self {
            provider,
            scorer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run the quality loop for one role.
    ///
    /// Returns the best attempt. Fails only when no attempt produced output,
    /// with the gateway error that stopped the loop.
    pub async fn execute(
        &self,
        task: &str,
        role: AgentRole,
        context: &AgentContext,
        settings: QualitySettings,
    ) -> Result<AgentOutput> {
        let config = role.config();
        let base_prompt = render_prompt(task, role, context);
        let max_iterations = settings.max_iterations.max(1);

        let mut prompt = base_prompt.clone();
        let mut best: Option<AgentOutput> = None;
        let mut attempts = 0u32;
        let mut tokens_used = 0u64;
        let mut last_error: Option<SwarmError> = None;

        for iteration in 1..=max_iterations {
            debug!(role = %role, iteration, max_iterations, "Agent attempt");
            let started = Instant::now();

            let request = CompletionRequest::new(config.model, prompt.as_str())
                .with_temperature(config.temperature)
                .with_max_tokens(config.max_tokens);

            let response = match self.provider.complete(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(role = %role, iteration, "Gateway call failed: {}", e);
                    last_error = Some(e);
                    break;
                }
            };
            attempts = iteration;
            tokens_used += response.usage.total();
            if let Some(metrics) = &self.metrics {
                metrics.record_response(&response);
            }

            let verdict = self
                .scorer
                .score(&ScoreRequest {
                    task,
                    artifact: &response.content,
                    role,
                })
                .await;
            let (score, feedback) = match verdict {
                Ok(q) => (q.score, q.feedback),
                Err(e) => {
                    warn!(role = %role, iteration, "Scoring failed: {}", e);
                    (0.0, format!("Scoring failed: {}", e))
                }
            };

            info!(role = %role, iteration, score, "Agent attempt scored {:.1}/100", score);

            let next_prompt = (score < settings.threshold && iteration < max_iterations)
                .then(|| feedback_prompt(&base_prompt, &response.content, score, &feedback));

            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(AgentOutput {
                    role,
                    content: response.content,
                    score,
                    feedback,
                    iterations: iteration,
                    latency_ms: started.elapsed().as_millis() as u64,
                    tokens_used: 0,
                });
            }

            match next_prompt {
                Some(p) => prompt = p,
                None => break,
            }
        }

        match best {
            Some(mut output) => {
                output.iterations = attempts;
                output.tokens_used = tokens_used;
                if output.score < settings.threshold {
                    info!(
                        role = %role,
                        "Threshold not met after {} attempts, best {:.1}/100",
                        attempts,
                        output.score
                    );
                }
                Ok(output)
            }
            None => Err(last_error.unwrap_or_else(|| {
                SwarmError::Workflow(format!("{} agent produced no output", role))
            })),
        }
    }
}
