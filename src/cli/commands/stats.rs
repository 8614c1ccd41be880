//! Stats Command
//!
//! Knowledge store overview: patterns, documentation, cache, agent
//! performance and the most effective documents.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

/// Documents listed under "Top Documentation"
const TOP_DOCS: usize = 10;

pub fn run(json: bool, config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let store = &ctx.store;
    let threshold = ctx.config.quality.threshold;

    let patterns = store.pattern_count()?;
    let docs = store.documentation_count()?;
    let cache = store.cache_stats()?;
    let agents = store.agent_stats()?;
    let mut top_docs = store.doc_effectiveness(ctx.config.documentation.min_samples, threshold)?;
    top_docs.truncate(TOP_DOCS);

    if json {
        let stats = serde_json::json!({
            "patterns": patterns,
            "documentation": docs,
            "cache": cache,
            "agents": agents,
            "top_docs": top_docs,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let out = Output::new();
    out.header("codeswarm Knowledge Store");
    out.field("Store", ctx.config.storage.path.display());
    out.field("Patterns", patterns);
    out.field("Documentation", docs);
    out.field("Cache entries", format!("{} ({} live)", cache.total, cache.live));

    if !agents.is_empty() {
        out.section("Agent Performance");
        for agent in &agents {
            println!(
                "  {:<15} runs {:>4}  success {:>5.1}%  avg {:>5.1}  latency {:>7.0}ms",
                agent.role,
                agent.runs,
                agent.success_rate() * 100.0,
                agent.avg_score,
                agent.avg_latency_ms
            );
        }
    }

    if !top_docs.is_empty() {
        out.section("Top Documentation");
        for doc in &top_docs {
            println!(
                "  {:>5.1}  {:>3} uses  {:>3.0}%  {}",
                doc.avg_score,
                doc.uses,
                doc.success_rate * 100.0,
                doc.url
            );
        }
    }

    Ok(())
}
