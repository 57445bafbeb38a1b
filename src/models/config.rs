//! Configuration data model and validation

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration of the probe subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-probe deadline in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Location of the persisted settings file; `None` uses the platform default
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// User-Agent sent with probe and content requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            settings_path: None,
            user_agent: default_user_agent(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl ProbeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the probe deadline as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        let min = crate::defaults::MIN_PROBE_TIMEOUT.as_millis() as u64;
        let max = crate::defaults::MAX_PROBE_TIMEOUT.as_millis() as u64;

        if self.probe_timeout_ms < min {
            return Err(AppError::config(format!("Probe timeout must be at least {}ms", min)));
        }

        if self.probe_timeout_ms > max {
            return Err(AppError::config(format!("Probe timeout cannot exceed {}ms", max)));
        }

        if self.user_agent.trim().is_empty() {
            return Err(AppError::config("User agent cannot be empty"));
        }

        if let Some(path) = &self.settings_path {
            if path.as_os_str().is_empty() {
                return Err(AppError::config("Settings path cannot be empty"));
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(timeout) = std::env::var("CDN_PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid CDN_PROBE_TIMEOUT_MS value '{}': {}", timeout, e)))?;
        }

        if let Ok(path) = std::env::var("CDN_PROBE_SETTINGS_PATH") {
            let path = path.trim();
            if !path.is_empty() {
                self.settings_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(user_agent) = std::env::var("CDN_PROBE_USER_AGENT") {
            self.user_agent = user_agent;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        if let Ok(verbose) = std::env::var("CDN_PROBE_VERBOSE") {
            self.verbose = verbose.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid CDN_PROBE_VERBOSE value '{}': {}", verbose, e)))?;
        }

        if let Ok(debug) = std::env::var("CDN_PROBE_DEBUG") {
            self.debug = debug.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid CDN_PROBE_DEBUG value '{}': {}", debug, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_probe_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_user_agent() -> String {
    crate::defaults::DEFAULT_USER_AGENT.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProbeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_timeout(), crate::defaults::DEFAULT_PROBE_TIMEOUT);
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = ProbeConfig::default();
        config.probe_timeout_ms = 50;
        assert!(config.validate().is_err());

        config.probe_timeout_ms = 60_001;
        assert!(config.validate().is_err());

        config.probe_timeout_ms = 3000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_user_agent_invalid() {
        let mut config = ProbeConfig::default();
        config.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_settings_path_invalid() {
        let mut config = ProbeConfig::default();
        config.settings_path = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ProbeConfig = serde_json::from_str(r#"{"probe_timeout_ms": 3000}"#).unwrap();
        assert_eq!(config.probe_timeout_ms, 3000);
        assert_eq!(config.user_agent, crate::defaults::DEFAULT_USER_AGENT);
        assert!(config.enable_color);
        assert!(config.settings_path.is_none());
    }
}
