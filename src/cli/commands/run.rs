//! Run Command
//!
//! Execute the generation workflow for one task.
//!
//! Usage:
//!   codeswarm run "create a login page" [--image mockup.png] [--threshold 92] [--json]

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::load_config;
use crate::context::RuntimeContext;
use crate::types::Result;
use crate::workflow::{WorkflowEngine, WorkflowOptions, WorkflowResult};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub task: String,
    pub image: Option<String>,
    pub threshold: Option<f64>,
    pub max_iterations: Option<u32>,
    pub json: bool,
    pub config_path: Option<PathBuf>,
}

pub async fn run(options: RunOptions) -> Result<()> {
    let mut config = load_config(options.config_path.as_deref())?;
    if let Some(threshold) = options.threshold {
        config.quality.threshold = threshold;
    }
    if let Some(max_iterations) = options.max_iterations {
        config.quality.workflow_max_iterations = max_iterations;
    }
    config.validate()?;

    let ctx = RuntimeContext::from_config(config)?;
    let engine = WorkflowEngine::new(&ctx)?;
    let result = engine
        .run(
            &options.task,
            &WorkflowOptions {
                image: options.image.clone(),
            },
        )
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, ctx.config.quality.threshold);
    }
    eprintln!("{}", ctx.metrics.summary().display());
    Ok(())
}

fn print_result(result: &WorkflowResult, threshold: f64) {
    let out = Output::new();

    out.header("Generated Artifact");
    println!("\n{}", result.synthesized());

    out.section("Quality");
    out.score("Average", result.avg_score, threshold);
    for output in result.outputs.values() {
        out.score(output.role.as_str(), output.score, threshold);
    }
    out.field("Gate iterations", result.gate_iterations);
    out.field("Similar patterns", result.similar_patterns);
    out.field("Documentation", result.doc_urls.len());
    out.field("Duration", format!("{:.1}s", result.duration_ms as f64 / 1000.0));

    if !result.skipped_stages.is_empty() {
        out.section("Skipped Stages");
        for skipped in &result.skipped_stages {
            out.warning(&format!("{}: {}", skipped.stage, skipped.reason));
        }
    }

    println!();
    match (&result.pattern_id, result.below_threshold) {
        (Some(id), _) => {
            out.success(&format!("Pattern stored: {}", id));
            if let Some(url) = &result.deployment_url {
                out.field("Deployed", url);
            }
        }
        (None, true) => out.warning(&format!(
            "Best result stayed below the {:.1} threshold; pattern not stored",
            threshold
        )),
        (None, false) => out.info("Pattern not stored"),
    }
}
