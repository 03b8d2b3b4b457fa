//! Background refresh loop shared by URL and Discovery key sources.
//!
//! The loop owns the only write path to the published [`KeySet`] slot.
//! Construction waits on a one-shot ready signal sent after the first
//! attempt, whatever its outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use reqwest::Client;
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::config::{ErrorHandler, RefreshConfig};
use crate::error::KeySourceError;
use crate::jwks::set::KeySet;
use crate::metrics::KeySourceMetrics;
use crate::shutdown::ShutdownSignal;

/// Lifecycle of a refreshing key source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No attempt has published a key set yet
    Uninitialized,
    /// A key set is published; refreshes continue
    Published,
    /// Shutdown received; the last key set stays queryable
    Stopped,
}

/// Published snapshot slot shared between the refresher and readers.
pub(crate) type KeySlot = Arc<ArcSwap<KeySet>>;

/// One refresh attempt: fetch, decode, publish.
pub(crate) trait Refresh: Send + Sync + 'static {
    /// Label used in logs and metrics
    const SOURCE: &'static str;

    /// Returns the number of published keys.
    fn refresh(&self) -> impl Future<Output = Result<usize, KeySourceError>> + Send;
}

/// Fetches a JWKS document and publishes it into the slot.
pub(crate) struct JwksFetcher {
    client: Client,
    max_body_bytes: usize,
    keys: KeySlot,
}

impl JwksFetcher {
    pub(crate) fn new(client: Client, max_body_bytes: usize) -> Self {
        Self {
            client,
            max_body_bytes,
            keys: Arc::new(ArcSwap::from_pointee(KeySet::new())),
        }
    }

    pub(crate) fn slot(&self) -> KeySlot {
        Arc::clone(&self.keys)
    }

    /// Fetches `url` and swaps in the decoded key set. The previous set is
    /// left in place on any failure.
    #[instrument(skip(self))]
    pub(crate) async fn fetch_and_publish(&self, url: &str) -> Result<usize, KeySourceError> {
        let body = self.get_document(url).await?;
        let set = KeySet::from_slice(&body)?;
        let count = set.len();

        self.keys.store(Arc::new(set));
        debug!(keys = count, "Published JWKS key set");
        Ok(count)
    }

    /// GETs `url` and returns the body of a 2xx response no larger than
    /// the configured cap.
    pub(crate) async fn get_document(&self, url: &str) -> Result<Vec<u8>, KeySourceError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeySourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.max_body_bytes;
        let too_large = || KeySourceError::BodyTooLarge {
            url: url.to_string(),
            limit,
        };

        // Content-Length is advisory; chunked bodies are capped while reading.
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if !fits(body.len(), chunk.len(), limit) {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn fits(read: usize, chunk: usize, limit: usize) -> bool {
    read.checked_add(chunk).is_some_and(|total| total <= limit)
}

/// Handle held by a key source onto its refresh task.
pub(crate) struct RefreshHandle {
    state: watch::Receiver<RefreshState>,
}

impl RefreshHandle {
    pub(crate) fn state(&self) -> RefreshState {
        *self.state.borrow()
    }
}

/// Spawns the refresh loop and waits for the first attempt to finish.
pub(crate) async fn spawn<R: Refresh>(
    job: R,
    config: &RefreshConfig,
    shutdown: ShutdownSignal,
) -> RefreshHandle {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (state_tx, state_rx) = watch::channel(RefreshState::Uninitialized);

    let task = RefreshTask {
        job,
        interval: config.interval,
        error_handler: config.error_handler.clone(),
        metrics: config.metrics.clone(),
        state: state_tx,
    };
    tokio::spawn(task.run(shutdown, ready_tx));

    // A dropped sender means the task is gone; lookups proceed either way.
    let _ = ready_rx.await;

    RefreshHandle { state: state_rx }
}

struct RefreshTask<R> {
    job: R,
    interval: Duration,
    error_handler: Option<ErrorHandler>,
    metrics: Option<Arc<KeySourceMetrics>>,
    state: watch::Sender<RefreshState>,
}

impl<R: Refresh> RefreshTask<R> {
    async fn run(self, mut shutdown: ShutdownSignal, ready: oneshot::Sender<()>) {
        let mut ready = Some(ready);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(source = R::SOURCE, interval = ?self.interval, "Starting JWKS refresher");

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                outcome = self.job.refresh() => outcome,
            };

            self.report(&outcome);

            if let Some(ready) = ready.take() {
                let _ = ready.send(());
            }
        }

        self.state.send_replace(RefreshState::Stopped);
        if let Some(ready) = ready.take() {
            let _ = ready.send(());
        }
        info!(source = R::SOURCE, "JWKS refresher stopped");
    }

    fn report(&self, outcome: &Result<usize, KeySourceError>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_refresh(R::SOURCE, outcome.as_ref().copied());
        }

        match outcome {
            Ok(count) => {
                info!(source = R::SOURCE, keys = count, "JWKS refreshed");
                self.state.send_replace(RefreshState::Published);
            }
            Err(err) => {
                warn!(
                    source = R::SOURCE,
                    error = %err,
                    code = err.code().as_str(),
                    retryable = err.is_retryable(),
                    "JWKS refresh failed, keeping previous key set"
                );
                if let Some(handler) = &self.error_handler {
                    handler(err);
                }
            }
        }
    }
}
