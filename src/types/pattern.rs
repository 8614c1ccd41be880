use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AgentRole, PatternId};

/// Best attempt produced by one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub role: AgentRole,
    pub content: String,
    /// Quality score 0-100
    pub score: f64,
    /// Scorer feedback for this attempt
    pub feedback: String,
    /// Attempts spent by the executor
    pub iterations: u32,
    /// Latency of the chosen attempt
    pub latency_ms: u64,
    /// Tokens spent across all attempts
    pub tokens_used: u64,
}

/// Agent output as persisted with a pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAgentOutput {
    pub role: String,
    pub content: String,
    pub score: f64,
    pub iterations: u32,
    pub latency_ms: u64,
}

/// Quality-approved generation retrieved from the knowledge store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    pub id: PatternId,
    pub task: String,
    pub avg_score: f64,
    pub timestamp: DateTime<Utc>,
    pub repository_url: Option<String>,
    pub doc_urls: Vec<String>,
    pub outputs: Vec<StoredAgentOutput>,
}

impl PatternRecord {
    /// Output of a given role, if it was stored
    pub fn output_for(&self, role: AgentRole) -> Option<&StoredAgentOutput> {
        self.outputs.iter().find(|o| o.role == role.as_str())
    }
}
