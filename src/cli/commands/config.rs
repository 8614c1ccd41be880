//! Config Command
//!
//! Manage codeswarm configuration.
//!
//! Usage:
//!   codeswarm config show [--json]
//!   codeswarm config path
//!   codeswarm config init [--force]

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::load_config;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    ConfigLoader::show_config(&config, json)
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize project configuration in the current directory
pub fn init(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let config_path = ConfigLoader::init_project(&root, force)?;

    let out = Output::new();
    out.success("Initialized project configuration");
    out.field("Config", config_path.display());
    out.info("API keys are read from OPENROUTER_API_KEY and TAVILY_API_KEY by default");
    Ok(())
}
