//! Configuration loading from .env files and environment variables

use crate::{
    config::env::EnvManager,
    error::Result,
    models::ProbeConfig,
};
use std::path::PathBuf;

/// Configuration parser combining defaults, a .env file and the environment
pub struct ConfigParser {
    env_file: Option<PathBuf>,
}

impl ConfigParser {
    /// Create a parser reading `.env` from the current directory
    pub fn new() -> Self {
        Self { env_file: Some(PathBuf::from(".env")) }
    }

    /// Create a parser reading a specific .env file
    pub fn with_env_file(path: PathBuf) -> Self {
        Self { env_file: Some(path) }
    }

    /// Create a parser that only looks at the process environment
    pub fn without_env_file() -> Self {
        Self { env_file: None }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<ProbeConfig> {
        let mut config = ProbeConfig::default();

        if let Some(path) = &self.env_file {
            EnvManager::load_env_file_from(path)?;
        }

        config.merge_from_env()?;
        config.validate()?;

        Ok(config)
    }
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to load the complete configuration
pub fn load_config() -> Result<ProbeConfig> {
    ConfigParser::new().parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &ProbeConfig) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Probe Timeout: {}ms", config.probe_timeout_ms));
    summary.push(format!(
        "Settings Path: {}",
        config.settings_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(platform default)".to_string())
    ));
    summary.push(format!("User Agent: {}", config.user_agent));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
