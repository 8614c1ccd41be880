//! Feedback Command
//!
//! Rate a stored pattern and flag unhelpful documentation.
//!
//! Usage:
//!   codeswarm feedback <pattern-id> --code-quality 4 --context-quality 2 \
//!       --unhelpful https://example.dev/doc [--comment "..."]
//!   codeswarm flag-doc <feedback-id> <url>...

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{PatternId, Result, UserFeedback};

#[derive(Debug, Clone)]
pub struct FeedbackOptions {
    pub pattern_id: String,
    pub code_quality: u8,
    pub context_quality: u8,
    pub unhelpful: Vec<String>,
    pub comment: Option<String>,
    pub retry_session: Option<String>,
}

pub fn run(options: FeedbackOptions, config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;

    let feedback = UserFeedback {
        comment: options.comment,
        unhelpful_docs: options.unhelpful,
        retry_session: options.retry_session,
        ..UserFeedback::new(
            PatternId::new(options.pattern_id),
            options.code_quality,
            options.context_quality,
        )
    };

    let receipt = ctx.store.store_user_feedback(&feedback)?;

    let out = Output::new();
    out.success(&format!("Feedback recorded: {}", receipt.feedback_id));
    if !feedback.unhelpful_docs.is_empty() {
        out.info(&format!("{} document(s) marked unhelpful", receipt.flagged));
        let ignored = feedback.unhelpful_docs.len().saturating_sub(receipt.flagged);
        if ignored > 0 {
            out.warning(&format!("{} unknown document(s) ignored", ignored));
        }
    }
    Ok(())
}

/// Link more unhelpful documents to an existing feedback record
pub fn flag_docs(feedback_id: &str, urls: &[String], config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let out = Output::new();

    for url in urls {
        if ctx.store.mark_doc_unhelpful(url, feedback_id)? {
            out.success(&format!("Flagged {}", url));
        } else {
            out.warning(&format!("Not flagged (unknown or already linked): {}", url));
        }
    }
    Ok(())
}
