//! Prompt Builder
//!
//! Standardized prompt construction for agent calls.
//!
//! ## Layout
//!
//! 1. **Role**: persona from the role config
//! 2. **Objectives**: numbered goals
//! 3. **Sections**: task, design spec, upstream outputs, patterns, docs
//! 4. **Output format**: fenced code followed by reasoning

use crate::constants::quality::FEEDBACK_EXCERPT_CHARS;
use crate::types::{AgentRole, capitalize_first, excerpt};

use super::AgentContext;

/// Upstream output kept in a downstream prompt (characters)
const UPSTREAM_EXCERPT_CHARS: usize = 4000;
/// Few-shot snippet length (characters)
const PATTERN_EXCERPT_CHARS: usize = 300;
/// Few-shot examples per prompt
const MAX_PATTERN_EXAMPLES: usize = 2;
/// Documentation summary length (characters)
const DOC_EXCERPT_CHARS: usize = 200;

const OUTPUT_FORMAT: &str = "Output format:\n\
```language\n\
[complete code]\n\
```\n\
\n\
Reasoning: [key decisions and how edge cases are handled]";

#[derive(Debug, Clone)]
enum PromptSection {
    Role { expertise: String, specialty: String },
    Objectives(Vec<String>),
    Text { header: String, content: String },
    Custom(String),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, specialty: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            specialty: specialty.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|o| o.to_string()).collect(),
        ));
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: header.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add a section only when content is present
    pub fn section_opt(self, header: &str, content: Option<&str>) -> Self {
        match content {
            Some(c) if !c.trim().is_empty() => self.section(header, c),
            _ => self,
        }
    }

    pub fn custom(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Custom(content.to_string()));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role {
                    expertise,
                    specialty,
                } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, specialty
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Custom(content) => {
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Render the prompt for one agent call
pub fn render_prompt(task: &str, role: AgentRole, context: &AgentContext) -> String {
    let config = role.config();

    let mut builder = PromptBuilder::new()
        .role(config.expertise, config.specialty)
        .objectives(config.objectives)
        .section("Task", task)
        .section_opt("Image Reference", context.image.as_deref())
        .section_opt("Design Specification", context.design.as_deref());

    for (upstream_role, content) in &context.upstream {
        let header = format!("{} Output", capitalize_first(upstream_role.as_str()));
        builder = builder.section(&header, &excerpt(content, UPSTREAM_EXCERPT_CHARS));
    }

    if let Some(examples) = pattern_examples(role, context) {
        builder = builder.section("Proven Patterns", &examples);
    }

    if !context.docs.is_empty() {
        let docs = context
            .docs
            .iter()
            .map(|d| {
                let mut line = format!("- {} ({}) [{}]", d.result.title, d.url(), d.tier);
                if !d.result.content.is_empty() {
                    line.push_str(&format!(
                        "\n  {}",
                        excerpt(&d.result.content, DOC_EXCERPT_CHARS)
                    ));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        builder = builder.section("Reference Documentation", &docs);
    }

    let prompt = builder.custom(OUTPUT_FORMAT).build();

    match &context.previous {
        Some(previous) => feedback_prompt(&prompt, &previous.content, previous.score, &previous.feedback),
        None => prompt,
    }
}

/// Few-shot block from similar patterns, preferring the same role's output
fn pattern_examples(role: AgentRole, context: &AgentContext) -> Option<String> {
    let examples: Vec<String> = context
        .patterns
        .iter()
        .filter_map(|p| {
            p.output_for(role).map(|o| {
                format!(
                    "{} (score {:.1}):\n{}",
                    p.task,
                    p.avg_score,
                    excerpt(&o.content, PATTERN_EXCERPT_CHARS)
                )
            })
        })
        .take(MAX_PATTERN_EXAMPLES)
        .enumerate()
        .map(|(i, e)| format!("{}. {}", i + 1, e))
        .collect();

    (!examples.is_empty()).then(|| examples.join("\n\n"))
}

/// Prompt for an improvement attempt: previous output, its score and the scorer feedback
pub fn feedback_prompt(original: &str, previous_output: &str, score: f64, feedback: &str) -> String {
    format!(
        "{}\n\n\
         # Previous Attempt (score {:.1}/100)\n\n\
         ```\n{}\n```\n\n\
         # Reviewer Feedback\n\n\
         {}\n\n\
         Improve on the previous attempt and address every point of feedback.",
        original,
        score,
        excerpt(previous_output, FEEDBACK_EXCERPT_CHARS),
        feedback.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::PreviousAttempt;
    use crate::types::{DocTier, PatternId, PatternRecord, ResolvedDoc, SearchResult, StoredAgentOutput};

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("software architect", "system design")
            .objectives(&["Choose a pattern", "Define interfaces"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("expert software architect"));
        assert!(prompt.contains("1. Choose a pattern"));
        assert!(prompt.contains("2. Define interfaces"));
    }

    #[test]
    fn test_empty_optional_sections_are_skipped() {
        let prompt = PromptBuilder::new()
            .section_opt("Design", None)
            .section_opt("Image", Some("  "))
            .section("Task", "x")
            .build();
        assert!(!prompt.contains("Design"));
        assert!(!prompt.contains("Image"));
    }

    #[test]
    fn test_render_includes_upstream_and_docs() {
        let mut doc = SearchResult::new("https://react.dev/learn", "React Docs");
        doc.content = "Components and hooks".to_string();
        let context = AgentContext {
            docs: vec![ResolvedDoc {
                result: doc,
                tier: DocTier::Fresh,
            }],
            ..AgentContext::default()
        }
        .with_upstream(AgentRole::Architecture, "Use MVC");

        let prompt = render_prompt("create a login page", AgentRole::Implementation, &context);

        assert!(prompt.contains("# Task\n\ncreate a login page"));
        assert!(prompt.contains("# Architecture Output\n\nUse MVC"));
        assert!(prompt.contains("https://react.dev/learn"));
        assert!(prompt.contains("Components and hooks"));
        assert!(prompt.contains("Output format"));
    }

    #[test]
    fn test_render_uses_role_specific_patterns() {
        let pattern = PatternRecord {
            id: PatternId::new("pattern_1"),
            task: "build a signup form".to_string(),
            avg_score: 93.0,
            timestamp: chrono::Utc::now(),
            repository_url: None,
            doc_urls: vec![],
            outputs: vec![StoredAgentOutput {
                role: "security".to_string(),
                content: "csrf tokens everywhere".to_string(),
                score: 95.0,
                iterations: 1,
                latency_ms: 10,
            }],
        };
        let context = AgentContext {
            patterns: vec![pattern],
            ..AgentContext::default()
        };

        let security = render_prompt("login", AgentRole::Security, &context);
        assert!(security.contains("Proven Patterns"));
        assert!(security.contains("csrf tokens everywhere"));

        let testing = render_prompt("login", AgentRole::Testing, &context);
        assert!(!testing.contains("Proven Patterns"));
    }

    #[test]
    fn test_feedback_prompt_truncates_previous_output() {
        let previous = "x".repeat(2000);
        let prompt = feedback_prompt("ORIGINAL", &previous, 72.5, "Add error handling");

        assert!(prompt.starts_with("ORIGINAL"));
        assert!(prompt.contains("score 72.5/100"));
        assert!(prompt.contains("Add error handling"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_rerun_prompt_embeds_previous_attempt() {
        let context = AgentContext::default().with_previous(PreviousAttempt {
            content: "fn login() {}".to_string(),
            score: 80.0,
            feedback: "Add code documentation".to_string(),
        });
        let prompt = render_prompt("login", AgentRole::Implementation, &context);
        assert!(prompt.contains("Previous Attempt (score 80.0/100)"));
        assert!(prompt.contains("fn login() {}"));
        assert!(prompt.contains("Add code documentation"));
    }
}
