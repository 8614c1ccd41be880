use serde::{Deserialize, Serialize};

use super::error::{Result, SwarmError, ValidationErrorKind};
use super::PatternId;

/// Valid rating range for user feedback
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// One user rating event for a stored pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFeedback {
    pub pattern_id: PatternId,
    pub code_quality: u8,
    pub context_quality: u8,
    pub comment: Option<String>,
    /// Documentation URLs the user marked unhelpful
    pub unhelpful_docs: Vec<String>,
    /// Follow-up session started because of this feedback
    pub retry_session: Option<String>,
}

impl UserFeedback {
    pub fn new(pattern_id: PatternId, code_quality: u8, context_quality: u8) -> Self {
        Self {
            pattern_id,
            code_quality,
            context_quality,
            comment: None,
            unhelpful_docs: Vec::new(),
            retry_session: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("code_quality", self.code_quality),
            ("context_quality", self.context_quality),
        ] {
            if !RATING_RANGE.contains(&value) {
                return Err(SwarmError::validation(
                    ValidationErrorKind::Range,
                    field,
                    format!("rating must be between 1 and 5, got {}", value),
                ));
            }
        }
        Ok(())
    }
}

/// Running per-role performance statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStats {
    pub role: String,
    pub runs: u64,
    /// Runs whose score met the threshold
    pub successes: u64,
    pub avg_score: f64,
    pub avg_latency_ms: f64,
}

impl AgentStats {
    pub fn success_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.successes as f64 / self.runs as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_rating_range() {
        let ok = UserFeedback::new(PatternId::new("p"), 5, 1);
        assert!(ok.validate().is_ok());

        let zero = UserFeedback::new(PatternId::new("p"), 0, 3);
        assert!(matches!(zero.validate(), Err(SwarmError::Validation(_))));

        let six = UserFeedback::new(PatternId::new("p"), 3, 6);
        assert!(six.validate().is_err());
    }

    #[test]
    fn test_agent_stats_success_rate() {
        let stats = AgentStats {
            role: "security".into(),
            runs: 4,
            successes: 3,
            avg_score: 91.0,
            avg_latency_ms: 1200.0,
        };
        assert!((stats.success_rate() - 0.75).abs() < f64::EPSILON);
    }
}
