use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::model::{MatchContext, Opinion, SourceKind};

/// Ways an external source can fail. None of these reach the ensemble: the
/// pending handle turns every one of them into "no opinion".
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("source timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl SourceError {
    /// Maps a transport error, folding client-side timeouts into `Timeout`.
    pub fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(timeout)
        } else {
            SourceError::Http(err)
        }
    }
}

/// A slow, fallible opinion provider (LLM call, web search).
pub trait OpinionSource: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Upper bound the caller waits for this source.
    fn timeout(&self) -> Duration;

    fn fetch(
        &self,
        ctx: &MatchContext,
        existing: &[Opinion],
    ) -> Result<Option<Opinion>, SourceError>;
}

/// Result slot of a source running on its own worker thread.
pub struct PendingOpinion {
    name: String,
    timeout: Duration,
    deadline: Instant,
    rx: Receiver<Result<Option<Opinion>, SourceError>>,
}

impl PendingOpinion {
    /// Blocks until the source answers or its deadline passes.
    ///
    /// Dropping the receiver on timeout makes the worker's late send fail, so
    /// a result that arrives after the deadline is discarded.
    pub fn wait(self) -> Option<Opinion> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(Ok(Some(opinion))) => {
                tracing::debug!(source = %self.name, outcome = %opinion.outcome, "source answered");
                Some(opinion)
            }
            Ok(Ok(None)) => {
                tracing::debug!(source = %self.name, "source had no opinion");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(source = %self.name, error = %err, "source failed; skipping");
                None
            }
            Err(RecvTimeoutError::Timeout) => {
                let err = SourceError::Timeout(self.timeout);
                tracing::warn!(source = %self.name, error = %err, "source missed its deadline; skipping");
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!(source = %self.name, "source worker exited without a result");
                None
            }
        }
    }
}

/// Starts `source` on a worker thread. The deadline counts from `started` so
/// sources launched together share the same clock.
///
/// The worker is detached. A source that misses its deadline keeps running
/// until its own fetch returns; HTTP-backed sources build their client with
/// `client_with_timeout(source.timeout())`, which bounds that tail to roughly
/// one more timeout. Its late result is dropped with the closed channel.
pub fn spawn_fetch(
    source: Arc<dyn OpinionSource>,
    ctx: MatchContext,
    existing: Vec<Opinion>,
    started: Instant,
) -> PendingOpinion {
    let name = source.name().to_string();
    let timeout = source.timeout();
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name(format!("source-{}", source.kind().as_str()))
        .spawn(move || {
            let result = source.fetch(&ctx, &existing);
            let _ = tx.send(result);
        });
    if let Err(err) = spawned {
        tracing::warn!(source = %name, error = %err, "failed to start source worker");
    }

    PendingOpinion {
        name,
        timeout,
        deadline: started + timeout,
        rx,
    }
}
