//! In-memory transport with scripted latencies for deterministic tests

use crate::client::ProbeTransport;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(usize),
    Fail(String),
    Hang,
}

/// Replies to each URL after a fixed delay, using tokio's clock
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    replies: HashMap<String, (Duration, Reply)>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, url: &str, after: Duration, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), (after, reply));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeTransport for ScriptedTransport {
    async fn fetch(&self, url: &str) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (after, reply) = self
            .replies
            .get(url)
            .cloned()
            .unwrap_or((Duration::ZERO, Reply::Fail("no route".to_string())));

        tokio::time::sleep(after).await;
        match reply {
            Reply::Body(len) => Ok(len),
            Reply::Fail(reason) => Err(AppError::network(reason)),
            Reply::Hang => std::future::pending().await,
        }
    }
}
