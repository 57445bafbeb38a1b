//! Probe round coordination
//!
//! A round starts one shared clock, spawns one probe task per endpoint and
//! hands results to the caller in completion order through a bounded channel
//! owned by that round. Rounds never share a channel, so results from an
//! abandoned round cannot leak into a newer one; every result also carries
//! its [`RoundId`] and [`ProbeCoordinator::is_latest`] tells callers whether
//! that round is still the most recent.

use crate::{
    client::ProbeTransport,
    logging::ProbeLogger,
    models::{Endpoint, ProbeConfig, ProbeResult, ProbeRound, RoundId},
    probe::{LatencyProbe, RoundClock},
};
use futures::stream::{self, Stream};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Fans probes out across endpoints, one round at a time or overlapping
pub struct ProbeCoordinator {
    probe: LatencyProbe,
    logger: ProbeLogger,
    next_round: AtomicU64,
    latest: AtomicU64,
}

impl ProbeCoordinator {
    /// Create a coordinator probing through `transport`
    pub fn new(transport: Arc<dyn ProbeTransport>, logger: ProbeLogger) -> Self {
        Self {
            probe: LatencyProbe::new(transport),
            logger,
            next_round: AtomicU64::new(0),
            latest: AtomicU64::new(0),
        }
    }

    /// Create a coordinator with a logger derived from configuration
    pub fn with_config(transport: Arc<dyn ProbeTransport>, config: &ProbeConfig) -> Self {
        Self::new(transport, ProbeLogger::new(config))
    }

    /// Start a round and return a handle yielding results as they complete
    ///
    /// Must be called from within a tokio runtime. Starting a round
    /// supersedes any earlier round for [`is_latest`](Self::is_latest).
    pub fn start_round(&self, endpoints: &[Endpoint], deadline: Duration) -> RoundHandle {
        let id = RoundId(self.next_round.fetch_add(1, Ordering::AcqRel) + 1);
        self.latest.fetch_max(id.0, Ordering::AcqRel);

        let clock = RoundClock::start();
        let (tx, rx) = mpsc::channel(endpoints.len().max(1));
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        self.logger.log_round_started(id, endpoints.len(), deadline);

        for endpoint in endpoints {
            let probe = self.probe.clone();
            let endpoint = endpoint.clone();
            let tx = tx.clone();
            let token = token.clone();

            tracker.spawn(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {}
                    result = probe.probe(id, &endpoint, &clock, deadline) => {
                        // Capacity covers every probe of the round, so this never waits
                        let _ = tx.send(result).await;
                    }
                }
            });
        }
        tracker.close();

        RoundHandle {
            round: ProbeRound::new(id, clock.started_at(), endpoints.len()),
            clock,
            rx,
            token,
            tracker,
            logger: self.logger.clone(),
            finished: false,
        }
    }

    /// Run a round to completion, calling `on_result` for each result as it lands
    ///
    /// Returns once every probe has reported, which is at most `deadline`
    /// after the round started.
    pub async fn run_round<F>(&self, endpoints: &[Endpoint], deadline: Duration, on_result: F) -> ProbeRound
    where
        F: FnMut(ProbeResult),
    {
        self.start_round(endpoints, deadline).drive(on_result).await
    }

    /// Check whether `round` is the most recently started round
    pub fn is_latest(&self, round: RoundId) -> bool {
        self.latest.load(Ordering::Acquire) == round.0
    }

    /// Most recently started round, if any
    pub fn latest_round(&self) -> Option<RoundId> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            id => Some(RoundId(id)),
        }
    }
}

/// Cloneable cancel switch for one round
#[derive(Debug, Clone)]
pub struct RoundCanceller {
    token: CancellationToken,
}

impl RoundCanceller {
    /// Abandon the round's in-flight probes; idempotent
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Receiving side of one round
///
/// Dropping a handle that has not finished cancels its round.
pub struct RoundHandle {
    round: ProbeRound,
    clock: RoundClock,
    rx: mpsc::Receiver<ProbeResult>,
    token: CancellationToken,
    tracker: TaskTracker,
    logger: ProbeLogger,
    finished: bool,
}

impl RoundHandle {
    pub fn id(&self) -> RoundId {
        self.round.id
    }

    /// Results delivered so far
    pub fn round(&self) -> &ProbeRound {
        &self.round
    }

    /// Time since the round's shared clock started
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Cancel the round; no result is delivered afterwards
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Get a canceller usable from other tasks or callbacks
    pub fn canceller(&self) -> RoundCanceller {
        RoundCanceller {
            token: self.token.clone(),
        }
    }

    /// Wait for the next result in completion order
    ///
    /// Returns `None` once every probe has reported or the round was cancelled.
    pub async fn next(&mut self) -> Option<ProbeResult> {
        if self.finished {
            return None;
        }
        if self.token.is_cancelled() {
            self.finish(true);
            return None;
        }

        let token = self.token.clone();
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.rx.recv() => result,
        };

        self.accept(received)
    }

    fn accept(&mut self, received: Option<ProbeResult>) -> Option<ProbeResult> {
        match received {
            // A result that raced the cancel is dropped
            Some(_) if self.token.is_cancelled() => {
                self.finish(true);
                None
            }
            Some(result) => {
                self.logger.log_probe_result(&result);
                self.round.record(result.clone());
                if self.round.is_complete() {
                    self.finish(false);
                }
                Some(result)
            }
            None => {
                let cancelled = self.token.is_cancelled() || !self.round.is_complete();
                self.finish(cancelled);
                None
            }
        }
    }

    /// Deliver every remaining result to `on_result` and return the round
    pub async fn drive<F>(mut self, mut on_result: F) -> ProbeRound
    where
        F: FnMut(ProbeResult),
    {
        while let Some(result) = self.next().await {
            on_result(result);
        }
        self.take_round()
    }

    /// Cancel the round, wait for its probe tasks to stop and return what was delivered
    pub async fn close(mut self) -> ProbeRound {
        if !self.finished {
            self.token.cancel();
            self.finish(true);
        }
        self.tracker.wait().await;
        self.take_round()
    }

    /// Turn the handle into a stream of results
    pub fn into_stream(self) -> impl Stream<Item = ProbeResult> {
        stream::unfold(self, |mut handle| async move {
            handle.next().await.map(|result| (result, handle))
        })
    }

    fn finish(&mut self, cancelled: bool) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.round.finish(cancelled);
        self.rx.close();
        self.logger.log_round_finished(&self.round);
    }

    fn take_round(&mut self) -> ProbeRound {
        let empty = ProbeRound::new(self.round.id, self.round.started_at, 0);
        std::mem::replace(&mut self.round, empty)
    }
}

impl Drop for RoundHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.token.cancel();
            self.finish(true);
        }
    }
}
