//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Identifier of a catalog endpoint; `0` is always the default endpoint
pub type EndpointId = u32;

/// The endpoint every fallback resolves to
pub const DEFAULT_ENDPOINT_ID: EndpointId = 0;

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// The test object was fetched; elapsed time since the round started
    Success(Duration),
    /// Transport-level failure (DNS, refused, TLS, reset, non-2xx status)
    NetworkError(String),
    /// No complete response before the deadline
    Timeout,
}

impl ProbeOutcome {
    /// Check whether the endpoint answered in time
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Elapsed time for successful probes
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::Success(elapsed) => Some(*elapsed),
            _ => None,
        }
    }

    /// Elapsed time in milliseconds for successful probes
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_secs_f64() * 1000.0)
    }

    /// Short status tag used in logs
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NetworkError(_) => "network_error",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(elapsed) => write!(f, "{} ms", elapsed.as_millis()),
            Self::NetworkError(reason) => write!(f, "network error: {}", reason),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

/// Latency classification used for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceLevel {
    /// Under 100 ms
    Excellent,
    /// 100-300 ms
    Good,
    /// 300-1000 ms
    Fair,
    /// Over one second
    Poor,
}

impl PerformanceLevel {
    /// Classify a measured latency
    pub fn from_duration(duration: Duration) -> Self {
        let ms = duration.as_millis();
        if ms < 100 {
            Self::Excellent
        } else if ms < 300 {
            Self::Good
        } else if ms < 1000 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}
