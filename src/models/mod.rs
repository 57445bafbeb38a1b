//! Data models and structures for the CDN latency probe

pub mod config;
pub mod endpoint;
pub mod probe;

// Re-export main model types
pub use config::ProbeConfig;
pub use endpoint::Endpoint;
pub use probe::{ProbeResult, ProbeRound, RoundId};
