//! CDN Latency Probe
//!
//! Measures how quickly each candidate content-delivery endpoint serves the
//! same small test object, streams per-endpoint results to the caller as they
//! complete, and keeps the caller's chosen endpoint as the active base URL for
//! all later downloads.

pub mod catalog;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod models;
pub mod probe;
pub mod report;
pub mod selector;
pub mod types;

// Re-export commonly used types
pub use catalog::EndpointCatalog;
pub use client::{ContentClient, NetworkClient, ProbeTransport};
pub use config::{ConfigStore, FileConfigStore, MemoryConfigStore, WindowSizeMode};
pub use coordinator::{ProbeCoordinator, RoundCanceller, RoundHandle};
pub use error::{AppError, Result};
pub use models::{Endpoint, ProbeConfig, ProbeResult, ProbeRound, RoundId};
pub use probe::{LatencyProbe, RoundClock};
pub use selector::{BaseEndpointSink, EndpointSelector, SelectorState};
pub use types::{EndpointId, ProbeOutcome};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Per-probe deadline, measured from the round start
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MIN_PROBE_TIMEOUT: Duration = Duration::from_millis(100);
    pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Path of the test object relative to each endpoint's base URL
    pub const PROBE_OBJECT_PATH: &str = "test/test_10kb";

    pub const DEFAULT_USER_AGENT: &str = concat!("cdn-latency-probe/", env!("CARGO_PKG_VERSION"));
    pub const SETTINGS_DIR_NAME: &str = "cdn-latency-probe";
    pub const SETTINGS_FILE_NAME: &str = "settings.json";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
