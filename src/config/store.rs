//! Persisted settings store
//!
//! The probe only needs integer settings: the selected endpoint index and the
//! window size preference. Hosts with their own settings mechanism implement
//! [`ConfigStore`]; the crate ships an in-memory store and a JSON file store.

use crate::error::{AppError, Result};
use crate::models::ProbeConfig;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// Integer key/value settings store
pub trait ConfigStore: Send + Sync {
    /// Read an integer setting; absent keys read as `0`
    fn get_int(&self, key: &str) -> Result<i64>;

    /// Write an integer setting
    fn set_int(&self, key: &str, value: i64) -> Result<()>;
}

/// Process-local store, used when nothing needs to survive a restart
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: RwLock<HashMap<String, i64>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with values
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        Self {
            values: RwLock::new(values.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_int(&self, key: &str) -> Result<i64> {
        let values = self.values.read()
            .map_err(|_| AppError::persistence("settings lock poisoned"))?;
        Ok(values.get(key).copied().unwrap_or(0))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        let mut values = self.values.write()
            .map_err(|_| AppError::persistence("settings lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON file store
///
/// Keys it does not manage are preserved on write. Writes go to a sibling
/// temporary file first and are then renamed over the settings file.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileConfigStore {
    /// Create a store backed by a specific file
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store at the platform default location
    pub fn at_default_location() -> Self {
        Self::new(Self::default_path())
    }

    /// Create a store at the configured settings path, or the default location
    pub fn from_config(config: &ProbeConfig) -> Self {
        match &config.settings_path {
            Some(path) => Self::new(path.clone()),
            None => Self::at_default_location(),
        }
    }

    /// Get the default settings path following the XDG specification
    pub fn default_path() -> PathBuf {
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else if let Ok(appdata) = std::env::var("APPDATA") {
            PathBuf::from(appdata)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config")
        } else {
            // Fallback for systems without HOME environment variable
            return PathBuf::from(crate::defaults::SETTINGS_FILE_NAME);
        };

        config_dir
            .join(crate::defaults::SETTINGS_DIR_NAME)
            .join(crate::defaults::SETTINGS_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            AppError::persistence(format!("Failed to read '{}': {}", self.path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            AppError::persistence(format!("Settings file '{}' is corrupt: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::persistence(format!("Failed to create settings directory '{}': {}", parent.display(), e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(values)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, json).map_err(|e| {
            AppError::persistence(format!("Failed to write '{}': {}", temp_path.display(), e))
        })?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            AppError::persistence(format!("Failed to replace '{}': {}", self.path.display(), e))
        })?;

        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn get_int(&self, key: &str) -> Result<i64> {
        let values = self.read_all()?;
        match values.get(key) {
            None | Some(Value::Null) => Ok(0),
            Some(value) => value.as_i64().ok_or_else(|| {
                AppError::persistence(format!("Setting '{}' is not an integer: {}", key, value))
            }),
        }
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        let _guard = self.write_lock.lock()
            .map_err(|_| AppError::persistence("settings write lock poisoned"))?;

        let mut values = self.read_all()?;
        values.insert(key.to_string(), Value::from(value));
        self.write_all(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_defaults_to_zero() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.get_int("api_cdn_index").unwrap(), 0);

        store.set_int("api_cdn_index", 2).unwrap();
        assert_eq!(store.get_int("api_cdn_index").unwrap(), 2);
    }

    #[test]
    fn test_memory_store_with_values() {
        let store = MemoryConfigStore::with_values([("window_size_mode", 1)]);
        assert_eq!(store.get_int("window_size_mode").unwrap(), 1);
    }

    #[test]
    fn test_file_store_missing_file_reads_zero() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(dir.path().join("settings.json"));
        assert_eq!(store.get_int("api_cdn_index").unwrap(), 0);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        FileConfigStore::new(path.clone()).set_int("api_cdn_index", 1).unwrap();

        let reopened = FileConfigStore::new(path.clone());
        assert_eq!(reopened.get_int("api_cdn_index").unwrap(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_preserves_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"language": "zh-CN", "api_cdn_index": 2}"#).unwrap();

        let store = FileConfigStore::new(path.clone());
        store.set_int("window_size_mode", 1).unwrap();

        let raw: BTreeMap<String, Value> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["language"], Value::from("zh-CN"));
        assert_eq!(raw["api_cdn_index"], Value::from(2));
        assert_eq!(raw["window_size_mode"], Value::from(1));
    }

    #[test]
    fn test_file_store_corrupt_file_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileConfigStore::new(path);
        assert!(matches!(store.get_int("api_cdn_index"), Err(AppError::Persistence(_))));
        assert!(matches!(store.set_int("api_cdn_index", 1), Err(AppError::Persistence(_))));
    }

    #[test]
    fn test_file_store_non_integer_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"api_cdn_index": "gh"}"#).unwrap();

        let store = FileConfigStore::new(path);
        assert!(matches!(store.get_int("api_cdn_index"), Err(AppError::Persistence(_))));
    }

    #[test]
    fn test_from_config_uses_settings_path() {
        let dir = TempDir::new().unwrap();
        let config = ProbeConfig {
            settings_path: Some(dir.path().join("custom.json")),
            ..ProbeConfig::default()
        };
        let store = FileConfigStore::from_config(&config);
        assert_eq!(store.path(), dir.path().join("custom.json"));
    }

    #[test]
    fn test_default_path_ends_with_settings_file() {
        let path = FileConfigStore::default_path();
        assert!(path.ends_with(crate::defaults::SETTINGS_FILE_NAME));
    }
}
