//! Link-Repo Command
//!
//! Attach the repository a pattern was pushed to.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub fn link(pattern_id: &str, url: &str, config_path: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    ctx.store.link_repository_url(pattern_id, url)?;
    Output::new().success(&format!("Linked {} to {}", pattern_id, url));
    Ok(())
}
