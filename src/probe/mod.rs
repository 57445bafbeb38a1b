//! Single-endpoint latency probe
//!
//! A probe issues one GET for the endpoint's test object and classifies the
//! outcome. Elapsed time is measured from the round's shared clock, not from
//! when the probe task happened to be scheduled, so results within a round
//! are comparable.

#[cfg(test)]
pub(crate) mod scripted;

use crate::{
    client::ProbeTransport,
    models::{Endpoint, ProbeResult, RoundId},
    types::ProbeOutcome,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Start instant shared by every probe of a round
#[derive(Debug, Clone, Copy)]
pub struct RoundClock {
    start: Instant,
    started_at: DateTime<Utc>,
}

impl RoundClock {
    /// Start the clock now
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Time since the round started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Absolute instant a probe with `deadline` must finish by
    pub fn deadline_for(&self, deadline: Duration) -> Instant {
        self.start + deadline
    }

    /// Wall-clock start time, for reporting
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Measures one endpoint; never retries and never touches selection state
#[derive(Clone)]
pub struct LatencyProbe {
    transport: Arc<dyn ProbeTransport>,
}

impl LatencyProbe {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self { transport }
    }

    /// Probe `endpoint` against the round clock
    ///
    /// Always yields a result; failures are reported as outcomes.
    pub async fn probe(
        &self,
        round: RoundId,
        endpoint: &Endpoint,
        clock: &RoundClock,
        deadline: Duration,
    ) -> ProbeResult {
        let fetch = self.transport.fetch(&endpoint.probe_url);

        let outcome = match timeout_at(clock.deadline_for(deadline), fetch).await {
            Err(_) => ProbeOutcome::Timeout,
            Ok(Ok(_)) => {
                let elapsed = clock.elapsed();
                // The body may complete in the same tick the deadline fires
                if elapsed > deadline {
                    ProbeOutcome::Timeout
                } else {
                    ProbeOutcome::Success(elapsed)
                }
            }
            Ok(Err(error)) if error.is_timeout() => ProbeOutcome::Timeout,
            Ok(Err(error)) => ProbeOutcome::NetworkError(error.to_string()),
        };

        ProbeResult::new(round, endpoint.clone(), outcome)
    }
}
