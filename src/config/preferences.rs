//! Well-known setting keys and the window size preference

use super::store::ConfigStore;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Setting key holding the selected endpoint id
pub const API_CDN_INDEX_KEY: &str = "api_cdn_index";

/// Setting key holding the window size mode
pub const WINDOW_SIZE_MODE_KEY: &str = "window_size_mode";

/// Launcher window size preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WindowSizeMode {
    #[default]
    Normal,
    Small,
}

impl WindowSizeMode {
    /// Map a stored index to a mode; anything unrecognized is `Normal`
    pub fn from_index(index: i64) -> Self {
        match index {
            1 => WindowSizeMode::Small,
            _ => WindowSizeMode::Normal,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            WindowSizeMode::Normal => 0,
            WindowSizeMode::Small => 1,
        }
    }

    /// Window size in logical pixels as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            WindowSizeMode::Normal => (1280, 768),
            WindowSizeMode::Small => (1064, 648),
        }
    }

    /// Read the mode from a store
    pub fn load(store: &dyn ConfigStore) -> Result<Self> {
        Ok(Self::from_index(store.get_int(WINDOW_SIZE_MODE_KEY)?))
    }

    /// Write the mode to a store
    pub fn save(&self, store: &dyn ConfigStore) -> Result<()> {
        store.set_int(WINDOW_SIZE_MODE_KEY, self.index())
    }
}

impl fmt::Display for WindowSizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        match self {
            WindowSizeMode::Normal => write!(f, "Normal ({}x{})", width, height),
            WindowSizeMode::Small => write!(f, "Small ({}x{})", width, height),
        }
    }
}
