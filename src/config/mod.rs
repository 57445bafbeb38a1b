//! Configuration management module
//!
//! Two kinds of configuration live here: the probe subsystem's own runtime
//! settings (`ProbeConfig`, loaded from `.env` and the environment) and the
//! host's persisted settings store, which holds the selected endpoint index
//! and the window size preference.

pub mod env;
pub mod parser;
pub mod preferences;
pub mod store;

// Re-export main functionality
pub use env::EnvManager;
pub use parser::{display_config_summary, load_config, ConfigParser};
pub use preferences::{WindowSizeMode, API_CDN_INDEX_KEY, WINDOW_SIZE_MODE_KEY};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};

// Re-export from models for convenience
pub use crate::models::ProbeConfig;
