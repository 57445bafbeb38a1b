//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file from the current directory if it exists
    ///
    /// Returns whether a file was loaded. Variables already present in the
    /// environment are not overridden.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load a specific .env file if it exists
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# CDN Latency Probe Configuration
#
# Values here are used unless the same variable is already set in the
# process environment.

# Per-probe deadline in milliseconds (100-60000)
# CDN_PROBE_TIMEOUT_MS=5000

# Settings file holding the selected CDN index
# CDN_PROBE_SETTINGS_PATH=/home/user/.config/cdn-latency-probe/settings.json

# User-Agent for probe and content requests
# CDN_PROBE_USER_AGENT=cdn-latency-probe/0.1.0

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Log probe rounds at info level (true/false)
# CDN_PROBE_VERBOSE=false

# Log every probe at debug level as JSON (true/false)
# CDN_PROBE_DEBUG=false
"#.to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content).map_err(|e| {
            AppError::io(format!("Failed to write example .env file '{}': {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "CDN_PROBE_TIMEOUT_MS" => {
                let timeout: u64 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid CDN_PROBE_TIMEOUT_MS value '{}': {}", value, e)))?;
                let min = crate::defaults::MIN_PROBE_TIMEOUT.as_millis() as u64;
                let max = crate::defaults::MAX_PROBE_TIMEOUT.as_millis() as u64;
                if timeout < min || timeout > max {
                    return Err(AppError::config(format!(
                        "CDN_PROBE_TIMEOUT_MS must be between {} and {}, got: {}", min, max, timeout
                    )));
                }
            }
            "CDN_PROBE_SETTINGS_PATH" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("CDN_PROBE_SETTINGS_PATH cannot be empty"));
                }
            }
            "CDN_PROBE_USER_AGENT" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("CDN_PROBE_USER_AGENT cannot be empty"));
                }
            }
            "ENABLE_COLOR" | "CDN_PROBE_VERBOSE" | "CDN_PROBE_DEBUG" => {
                value.trim().parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("CDN_PROBE_TIMEOUT_MS", "Per-probe deadline in milliseconds (100-60000)", "3000"),
            ("CDN_PROBE_SETTINGS_PATH", "Settings file holding the selected CDN", "/tmp/settings.json"),
            ("CDN_PROBE_USER_AGENT", "User-Agent for probe and content requests", "launcher/1.0"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("CDN_PROBE_VERBOSE", "Log probe rounds at info level", "false"),
            ("CDN_PROBE_DEBUG", "Log every probe as JSON", "false"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<24} {}\n", var, description));
            help.push_str(&format!("  {:<24} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Environment variables\n");
        help.push_str("  2. .env file values\n");
        help.push_str("  3. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }

    /// Validate the contents of a .env file without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
