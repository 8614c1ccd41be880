//! Cache Command
//!
//! Usage:
//!   codeswarm cache purge

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

/// Physically delete expired search cache rows
pub fn purge(config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let removed = ctx.store.purge_expired_cache()?;
    let stats = ctx.store.cache_stats()?;

    let out = Output::new();
    out.success(&format!("Removed {} expired cache entries", removed));
    out.field("Live entries", stats.live);
    Ok(())
}
