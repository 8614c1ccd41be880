//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/codeswarm/config.toml)
//! 3. Project config (.codeswarm/config.toml)
//! 4. Environment variables (CODESWARM_* prefix)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{Result, SwarmError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_with(Self::global_config_path().as_deref(), &Self::project_config_path())
    }

    /// Load with explicit global/project file locations
    pub fn load_with(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // e.g. CODESWARM_QUALITY_THRESHOLD -> quality.threshold
        figment = figment.merge(Env::prefixed("CODESWARM_").split('_').lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| SwarmError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| SwarmError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/codeswarm/)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "codeswarm").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".codeswarm")
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(config: &Config, as_json: bool) -> Result<()> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config).map_err(|e| SwarmError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default project config under `root/.codeswarm/`
    pub fn init_project(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = root.join(Self::project_dir());
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() || force {
            let rendered = toml::to_string_pretty(&Config::default())
                .map_err(|e| SwarmError::Config(e.to_string()))?;
            fs::write(
                &config_path,
                format!("# codeswarm project configuration\n\n{}", rendered),
            )?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::load_with(None, &temp.path().join("missing.toml")).unwrap();
        assert_eq!(config.version, "1.0");
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[documentation]\nmax_results = 8\n\n[storage]\npath = \"kb.db\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.documentation.max_results, 8);
        assert_eq!(config.storage.path, PathBuf::from("kb.db"));
        assert_eq!(config.quality.threshold, 90.0);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[quality]\nthreshold = 250.0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(SwarmError::Config(_))
        ));
    }

    #[test]
    fn test_init_project_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp.path(), false).unwrap();
        assert!(path.exists());

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.quality.agent_max_iterations, 3);
    }

    #[test]
    fn test_env_override() {
        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var("CODESWARM_QUALITY_THRESHOLD", "95");
        }
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::load_with(None, &temp.path().join("none.toml")).unwrap();
        assert_eq!(config.quality.threshold, 95.0);
        unsafe {
            std::env::remove_var("CODESWARM_QUALITY_THRESHOLD");
        }
    }
}
