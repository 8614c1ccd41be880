//! Workflow result types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AgentOutput, AgentRole, PatternId, capitalize_first};

/// Gate outcome for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Average met the threshold
    Accept,
    /// Below threshold; underperforming agents rerun
    Retry,
}

impl GateDecision {
    pub fn evaluate(avg_score: f64, threshold: f64) -> Self {
        if avg_score >= threshold {
            Self::Accept
        } else {
            Self::Retry
        }
    }
}

/// Stage names recorded in metrics and skip reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PatternRetrieval,
    Documentation,
    Vision,
    Architecture,
    Implementation,
    Security,
    Testing,
    Persistence,
    Deployment,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternRetrieval => "pattern_retrieval",
            Self::Documentation => "documentation",
            Self::Vision => "vision",
            Self::Architecture => "architecture",
            Self::Implementation => "implementation",
            Self::Security => "security",
            Self::Testing => "testing",
            Self::Persistence => "persistence",
            Self::Deployment => "deployment",
        }
    }

    pub fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::Architecture => Self::Architecture,
            AgentRole::Implementation => Self::Implementation,
            AgentRole::Security => Self::Security,
            AgentRole::Testing => Self::Testing,
            AgentRole::Vision => Self::Vision,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedStage {
    pub stage: Stage,
    pub reason: String,
}

/// Outcome of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub task: String,
    /// Best average over the code roles that produced output
    pub avg_score: f64,
    pub outputs: BTreeMap<AgentRole, AgentOutput>,
    pub skipped_stages: Vec<SkippedStage>,
    pub pattern_persisted: bool,
    pub pattern_id: Option<PatternId>,
    /// Gate cap reached without meeting the threshold
    pub below_threshold: bool,
    pub gate_iterations: u32,
    pub doc_urls: Vec<String>,
    pub similar_patterns: usize,
    /// Where the deployer published the persisted artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    pub duration_ms: u64,
}

impl WorkflowResult {
    pub fn output(&self, role: AgentRole) -> Option<&AgentOutput> {
        self.outputs.get(&role)
    }

    pub fn was_skipped(&self, stage: Stage) -> bool {
        self.skipped_stages.iter().any(|s| s.stage == stage)
    }

    /// Combined artifact: one section per agent in role order
    pub fn synthesized(&self) -> String {
        synthesize(&self.outputs)
    }
}

pub(crate) fn synthesize(outputs: &BTreeMap<AgentRole, AgentOutput>) -> String {
    outputs
        .values()
        .map(|o| {
            format!(
                "## {} (score {:.1})\n\n{}",
                capitalize_first(o.role.as_str()),
                o.score,
                o.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Average score over the code roles present in `outputs`
pub fn average_code_score(outputs: &BTreeMap<AgentRole, AgentOutput>) -> Option<f64> {
    let scores: Vec<f64> = AgentRole::CODE_ROLES
        .iter()
        .filter_map(|role| outputs.get(role).map(|o| o.score))
        .collect();
    (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(role: AgentRole, score: f64) -> AgentOutput {
        AgentOutput {
            role,
            content: format!("{} code", role),
            score,
            feedback: String::new(),
            iterations: 1,
            latency_ms: 1,
            tokens_used: 1,
        }
    }

    #[test]
    fn test_average_ignores_vision_and_missing_roles() {
        let mut outputs = BTreeMap::new();
        assert_eq!(average_code_score(&outputs), None);

        outputs.insert(AgentRole::Vision, output(AgentRole::Vision, 10.0));
        assert_eq!(average_code_score(&outputs), None);

        outputs.insert(AgentRole::Implementation, output(AgentRole::Implementation, 90.0));
        outputs.insert(AgentRole::Security, output(AgentRole::Security, 80.0));
        assert_eq!(average_code_score(&outputs), Some(85.0));
    }

    #[test]
    fn test_gate_decision() {
        assert_eq!(GateDecision::evaluate(90.0, 90.0), GateDecision::Accept);
        assert_eq!(GateDecision::evaluate(89.99, 90.0), GateDecision::Retry);
    }

    #[test]
    fn test_synthesized_orders_by_role() {
        let mut outputs = BTreeMap::new();
        outputs.insert(AgentRole::Testing, output(AgentRole::Testing, 91.0));
        outputs.insert(AgentRole::Architecture, output(AgentRole::Architecture, 93.0));
        let result = WorkflowResult {
            task: "t".to_string(),
            avg_score: 92.0,
            outputs,
            skipped_stages: vec![],
            pattern_persisted: false,
            pattern_id: None,
            below_threshold: false,
            gate_iterations: 1,
            doc_urls: vec![],
            similar_patterns: 0,
            deployment_url: None,
            duration_ms: 0,
        };

        let text = result.synthesized();
        let arch = text.find("## Architecture (score 93.0)").unwrap();
        let testing = text.find("## Testing (score 91.0)").unwrap();
        assert!(arch < testing);
    }
}
