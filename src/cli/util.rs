//! CLI Common Utilities
//!
//! Config loading and store access shared by the command handlers.

use std::path::Path;

use crate::config::{Config, ConfigLoader};
use crate::context::open_store;
use crate::storage::SharedKnowledgeStore;
use crate::types::{Result, SwarmError};

/// Effective configuration: an explicit file replaces the global/project chain
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) if !path.exists() => Err(SwarmError::Config(format!(
            "config file not found: {}",
            path.display()
        ))),
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Resources for commands that work on the knowledge store only
pub struct CommandContext {
    pub config: Config,
    pub store: SharedKnowledgeStore,
}

impl CommandContext {
    /// Load config and open the store; the store is mandatory here
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let store = open_store(&config.storage).ok_or_else(|| {
            SwarmError::Storage(format!(
                "cannot open knowledge store at {}",
                config.storage.path.display()
            ))
        })?;
        Ok(Self { config, store })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = load_config(Some(&temp.path().join("nope.toml")));
        assert!(matches!(result, Err(SwarmError::Config(_))));
    }

    #[test]
    fn test_command_context_opens_configured_store() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("kb.db");
        let config_path = temp.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!("[storage]\npath = {:?}\n", db_path.display().to_string()),
        )
        .unwrap();

        let ctx = CommandContext::load(Some(&config_path)).unwrap();
        assert_eq!(ctx.store.pattern_count().unwrap(), 0);
        assert!(db_path.exists());
    }
}
