//! Quality Scoring
//!
//! The [`Scorer`] trait is the seam for the external evaluator. Two
//! implementations ship:
//!
//! - [`LlmScorer`]: LLM-as-judge through the gateway, JSON verdict
//! - [`HeuristicScorer`]: deterministic indicator-based scoring, no network

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::metrics::SharedMetrics;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::constants::quality::MAX_SCORE;
use crate::types::{AgentRole, ErrorCategory, ProviderError, Result, excerpt};

/// What gets scored
#[derive(Debug, Clone, Copy)]
pub struct ScoreRequest<'a> {
    pub task: &'a str,
    pub artifact: &'a str,
    pub role: AgentRole,
}

/// Score in `[0, 100]` with improvement feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
}

impl QualityScore {
    pub fn new(score: f64, feedback: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, MAX_SCORE),
            feedback: feedback.into(),
        }
    }
}

#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<QualityScore>;

    /// Scorer name for logging
    fn name(&self) -> &str;
}

pub type SharedScorer = Arc<dyn Scorer + Send + Sync>;

// =============================================================================
// LLM Judge
// =============================================================================

/// Artifact excerpt sent to the judge (characters)
const JUDGE_ARTIFACT_CHARS: usize = 12_000;

/// LLM-as-judge scorer
pub struct LlmScorer {
    provider: SharedProvider,
    model: String,
    metrics: Option<SharedMetrics>,
}

impl LlmScorer {
    pub fn new(provider: SharedProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn build_prompt(request: &ScoreRequest<'_>) -> String {
        format!(
            "<ROLE>\nYou are a strict senior code reviewer grading the output of the {role} agent.\n</ROLE>\n\n\
             # Task\n\n{task}\n\n\
             # Artifact\n\n```\n{artifact}\n```\n\n\
             Grade correctness, completeness, code quality and security from 0 to 100.\n\
             Respond ONLY with JSON: {{\"score\": <number>, \"feedback\": \"<concrete improvements>\"}}",
            role = request.role,
            task = request.task,
            artifact = excerpt(request.artifact, JUDGE_ARTIFACT_CHARS),
        )
    }

    /// Extract the JSON verdict, tolerating code fences and surrounding prose
    fn parse_verdict(content: &str) -> Result<QualityScore> {
        let json = match (content.find('{'), content.rfind('}')) {
            (Some(start), Some(end)) if start < end => &content[start..=end],
            _ => {
                return Err(ProviderError::new(
                    ErrorCategory::ParseError,
                    format!("judge returned no JSON verdict: {}", excerpt(content, 200)),
                )
                .into());
            }
        };

        let verdict: QualityScore = serde_json::from_str(json).map_err(|e| {
            ProviderError::new(
                ErrorCategory::ParseError,
                format!("invalid judge verdict: {}", e),
            )
        })?;
        Ok(QualityScore::new(verdict.score, verdict.feedback))
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<QualityScore> {
        let completion = CompletionRequest::new(&self.model, Self::build_prompt(request))
            .with_temperature(0.0)
            .with_max_tokens(1000);

        let response = self.provider.complete(&completion).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_response(&response);
        }

        let verdict = Self::parse_verdict(&response.content)?;
        debug!(role = %request.role, score = verdict.score, "Judge verdict");
        Ok(verdict)
    }

    fn name(&self) -> &str {
        "llm-judge"
    }
}

// =============================================================================
// Heuristic Scorer
// =============================================================================

/// Indicator-based scoring: base 85, length bonuses, +2 per quality indicator
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    const BASE: f64 = 85.0;
    const EXCELLENT: f64 = 95.0;

    fn has_docs(artifact: &str) -> bool {
        ["#", "//", "\"\"\"", "/*"].iter().any(|m| artifact.contains(m))
    }

    fn has_error_handling(artifact: &str) -> bool {
        (artifact.contains("try") && (artifact.contains("except") || artifact.contains("catch")))
            || artifact.contains("Result<")
    }

    fn has_tests(artifact: &str) -> bool {
        artifact.to_lowercase().contains("test") || artifact.contains("assert")
    }

    fn has_types(artifact: &str) -> bool {
        artifact.contains(':') && artifact.contains("->")
    }

    fn has_validation(artifact: &str) -> bool {
        artifact.contains("if")
            && (artifact.contains("raise")
                || artifact.contains("throw")
                || artifact.contains("Err("))
    }

    fn compute(artifact: &str, role: AgentRole) -> f64 {
        let len = artifact.chars().count();
        let mut score = Self::BASE;

        if len > 1000 {
            score += 5.0;
        }
        if len > 2000 {
            score += 3.0;
        }

        let indicators = [
            Self::has_docs(artifact),
            Self::has_error_handling(artifact),
            Self::has_tests(artifact),
            Self::has_types(artifact),
            Self::has_validation(artifact),
        ];
        score += 2.0 * indicators.iter().filter(|i| **i).count() as f64;

        if role == AgentRole::Security && score < Self::EXCELLENT {
            score += 3.0;
        }

        score.min(MAX_SCORE)
    }

    fn feedback(artifact: &str, score: f64, threshold: f64) -> String {
        if score >= Self::EXCELLENT {
            return "Excellent! Code meets all quality standards.".to_string();
        }

        let mut lines = vec![format!(
            "Current score: {:.1}/100. Areas for improvement:",
            score
        )];
        if score < threshold {
            lines.push("- Enhance code completeness and correctness".to_string());
        }
        if artifact.chars().count() < 200 {
            lines.push("- Add more comprehensive implementation".to_string());
        }
        if !Self::has_error_handling(artifact) {
            lines.push("- Add error handling".to_string());
        }
        if !artifact.contains('#') && !artifact.contains("//") {
            lines.push("- Add code documentation".to_string());
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Scorer for HeuristicScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<QualityScore> {
        let score = Self::compute(request.artifact, request.role);
        let feedback = Self::feedback(
            request.artifact,
            score,
            crate::constants::quality::DEFAULT_THRESHOLD,
        );
        Ok(QualityScore::new(score, feedback))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
