use serde::{Deserialize, Serialize};
use std::fmt;

/// Agent roles in the generation workflow.
///
/// Closed set; each role carries a static configuration record
/// (see [`crate::agents::RoleConfig`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Architecture,
    Implementation,
    Security,
    Testing,
    Vision,
}

impl AgentRole {
    /// Roles whose output is code and counts toward the average score
    pub const CODE_ROLES: [AgentRole; 4] = [
        AgentRole::Architecture,
        AgentRole::Implementation,
        AgentRole::Security,
        AgentRole::Testing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Implementation => "implementation",
            Self::Security => "security",
            Self::Testing => "testing",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "architecture" => Ok(Self::Architecture),
            "implementation" => Ok(Self::Implementation),
            "security" => Ok(Self::Security),
            "testing" => Ok(Self::Testing),
            "vision" => Ok(Self::Vision),
            _ => Err(format!(
                "Unknown agent role: {}. Valid values: architecture, implementation, security, testing, vision",
                s
            )),
        }
    }
}
