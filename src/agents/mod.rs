//! Agents
//!
//! Role configuration, prompt rendering, scoring and the quality loop that
//! wraps every gateway call.
//!
//! Each [`AgentRole`] carries a static [`RoleConfig`]; the workflow dispatches
//! over the enum and never branches on model names.

pub mod executor;
pub mod prompt;
pub mod scorer;
pub mod vision;

pub use executor::{AgentExecutor, QualitySettings};
pub use prompt::{PromptBuilder, feedback_prompt, render_prompt};
pub use scorer::{
    HeuristicScorer, LlmScorer, QualityScore, ScoreRequest, Scorer, SharedScorer,
};
pub use vision::VisionTrigger;

use std::collections::BTreeMap;

use crate::types::{AgentRole, PatternRecord, ResolvedDoc};

// =============================================================================
// Role Configuration
// =============================================================================

/// Static per-role model and persona settings
#[derive(Debug)]
pub struct RoleConfig {
    /// Gateway model id
    pub model: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Persona, e.g. "software architect"
    pub expertise: &'static str,
    /// What the persona specializes in for this workflow
    pub specialty: &'static str,
    pub objectives: &'static [&'static str],
}

static ARCHITECTURE: RoleConfig = RoleConfig {
    model: "anthropic/claude-sonnet-4.5",
    temperature: 0.7,
    max_tokens: 4000,
    expertise: "software architect",
    specialty: "system design, component decomposition and interface contracts",
    objectives: &[
        "Choose an architecture pattern that fits the task",
        "Decompose the system into components with clear responsibilities",
        "Define interfaces and data flow between components",
        "Select a technology stack and justify it briefly",
    ],
};

static IMPLEMENTATION: RoleConfig = RoleConfig {
    model: "openai/gpt-5-pro",
    temperature: 0.5,
    max_tokens: 6000,
    expertise: "software engineer",
    specialty: "production-quality implementation of a given architecture",
    objectives: &[
        "Follow the architecture specification exactly",
        "Write complete, runnable code",
        "Handle errors and edge cases explicitly",
        "Document non-obvious logic",
    ],
};

static SECURITY: RoleConfig = RoleConfig {
    model: "anthropic/claude-opus-4.1",
    temperature: 0.3,
    max_tokens: 5000,
    expertise: "security engineer",
    specialty: "secure coding, OWASP Top 10 and hardening",
    objectives: &[
        "Identify vulnerabilities in the proposed design",
        "Provide hardened code for authentication, input validation and secrets",
        "Add security headers and rate limiting where relevant",
    ],
};

static TESTING: RoleConfig = RoleConfig {
    model: "x-ai/grok-4",
    temperature: 0.4,
    max_tokens: 12000,
    expertise: "QA engineer",
    specialty: "test automation and edge-case discovery",
    objectives: &[
        "Write unit tests for every component",
        "Cover edge cases and failure paths",
        "Add integration tests for the main flows",
    ],
};

static VISION: RoleConfig = RoleConfig {
    model: "openai/gpt-5",
    temperature: 0.6,
    max_tokens: 3000,
    expertise: "UI/UX analyst",
    specialty: "turning sketches and mockups into technical specifications",
    objectives: &[
        "List every visible UI component and its hierarchy",
        "Describe layout, spacing, colors and typography with exact values",
        "Identify user interactions and responsive behavior",
    ],
};

impl AgentRole {
    /// Static configuration for this role
    pub fn config(&self) -> &'static RoleConfig {
        match self {
            Self::Architecture => &ARCHITECTURE,
            Self::Implementation => &IMPLEMENTATION,
            Self::Security => &SECURITY,
            Self::Testing => &TESTING,
            Self::Vision => &VISION,
        }
    }
}

// =============================================================================
// Agent Context
// =============================================================================

/// Earlier attempt embedded in a gate re-run prompt
#[derive(Debug, Clone)]
pub struct PreviousAttempt {
    pub content: String,
    pub score: f64,
    pub feedback: String,
}

/// Role-specific context assembled by the workflow
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    /// Similar stored patterns used as few-shot examples
    pub patterns: Vec<PatternRecord>,
    /// Resolved reference documentation
    pub docs: Vec<ResolvedDoc>,
    /// Vision stage output
    pub design: Option<String>,
    /// Image reference supplied by the user
    pub image: Option<String>,
    /// Outputs of earlier stages, read-only
    pub upstream: BTreeMap<AgentRole, String>,
    /// Set when the gate re-runs an underperforming agent
    pub previous: Option<PreviousAttempt>,
}

impl AgentContext {
    pub fn with_upstream(mut self, role: AgentRole, content: impl Into<String>) -> Self {
        self.upstream.insert(role, content.into());
        self
    }

    pub fn with_previous(mut self, previous: PreviousAttempt) -> Self {
        self.previous = Some(previous);
        self
    }
}
