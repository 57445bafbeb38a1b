//! Probe result and round data models

use crate::models::Endpoint;
use crate::types::ProbeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of one probe round, unique within a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round-{}", self.0)
    }
}

/// Result of probing one endpoint in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Round that produced this result
    pub round: RoundId,
    /// Endpoint that was probed
    pub endpoint: Endpoint,
    /// What happened
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn new(round: RoundId, endpoint: Endpoint, outcome: ProbeOutcome) -> Self {
        Self { round, endpoint, outcome }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Results collected for one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRound {
    /// Round identifier
    pub id: RoundId,
    /// Wall-clock time the shared round clock started
    pub started_at: DateTime<Utc>,
    /// When the last result arrived or the round was cancelled
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of endpoints probed
    pub expected: usize,
    /// Results in delivery order
    pub results: Vec<ProbeResult>,
    /// Whether the round was cancelled before every probe reported
    pub cancelled: bool,
}

impl ProbeRound {
    /// Create an empty round
    pub fn new(id: RoundId, started_at: DateTime<Utc>, expected: usize) -> Self {
        Self {
            id,
            started_at,
            completed_at: None,
            expected,
            results: Vec::with_capacity(expected),
            cancelled: false,
        }
    }

    /// Record a delivered result
    pub fn record(&mut self, result: ProbeResult) {
        self.results.push(result);
    }

    /// Mark the round finished
    pub fn finish(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
        self.completed_at = Some(Utc::now());
    }

    /// Check whether every endpoint reported
    pub fn is_complete(&self) -> bool {
        self.results.len() == self.expected
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Successful results, in delivery order
    pub fn successes(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Fastest successful endpoint
    pub fn fastest(&self) -> Option<&ProbeResult> {
        self.successes().min_by_key(|r| r.outcome.elapsed())
    }

    /// Result for a given endpoint id
    pub fn result_for(&self, id: crate::types::EndpointId) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.endpoint.id == id)
    }

    /// Wall time between round start and completion
    pub fn elapsed(&self) -> Option<Duration> {
        self.completed_at
            .and_then(|done| (done - self.started_at).to_std().ok())
    }
}
