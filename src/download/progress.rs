//! Shared transfer state and decoupled progress publication.
//!
//! Fetchers credit bytes to [`TransferState`] as they are written. A separate
//! sampling task reads the counter on a fixed interval and republishes a
//! [`ProgressSnapshot`] through [`ProgressAggregator`], so display code never
//! contends with transfer workers and a slow observer never blocks a fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::error::ChunkFailure;

/// Point-in-time view of a job's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// Bytes written so far.
    pub downloaded: u64,
    /// Expected total bytes (0 until known).
    pub total: u64,
    /// Time since the job started.
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Completion ratio in `0.0..=1.0`, or 0 when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.downloaded as f64 / self.total as f64).min(1.0)
        }
    }

    /// Average rate in bytes per second since start.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= f64::EPSILON {
            0.0
        } else {
            self.downloaded as f64 / secs
        }
    }
}

/// Receiving end of a job's progress feed.
pub type ProgressFeed = watch::Receiver<ProgressSnapshot>;

/// Publishes snapshots to any number of observers.
///
/// Publishing overwrites the previous snapshot; observers see the latest
/// value whenever they look, and publishing never waits on them.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
    started: Instant,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAggregator {
    /// Creates an aggregator whose elapsed clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    /// Creates an aggregator with an explicit start instant.
    #[must_use]
    pub fn started_at(started: Instant) -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self {
            tx: Arc::new(tx),
            started,
        }
    }

    /// Returns a new receiver for the feed.
    #[must_use]
    pub fn subscribe(&self) -> ProgressFeed {
        self.tx.subscribe()
    }

    /// Publishes a snapshot of `downloaded` out of `total` bytes.
    pub fn update(&self, downloaded: u64, total: u64) {
        self.tx.send_replace(ProgressSnapshot {
            downloaded,
            total,
            elapsed: self.started.elapsed(),
        });
    }

    /// Returns the most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }
}

/// Shared mutable record of one job's aggregate progress and failures.
#[derive(Debug)]
pub struct TransferState {
    downloaded: AtomicU64,
    total: u64,
    started: Instant,
    errors: Mutex<Vec<ChunkFailure>>,
}

impl TransferState {
    /// Creates a state for a job expecting `total` bytes.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            downloaded: AtomicU64::new(0),
            total,
            started: Instant::now(),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Credits `n` freshly written bytes.
    pub fn add_bytes(&self, n: u64) {
        self.downloaded.fetch_add(n, Ordering::Relaxed);
    }

    /// Withdraws credit for `n` bytes of a failed attempt.
    pub fn sub_bytes(&self, n: u64) {
        self.downloaded.fetch_sub(n, Ordering::Relaxed);
    }

    /// Current byte count.
    #[must_use]
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// Expected total bytes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Instant the job started.
    #[must_use]
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Records a terminal chunk failure.
    pub fn add_error(&self, failure: ChunkFailure) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    /// Number of terminal chunk failures so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drains recorded failures in the order they were recorded.
    pub fn take_errors(&self) -> Vec<ChunkFailure> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Handle to a running sampling loop.
#[derive(Debug)]
pub struct Sampler {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sampler {
    /// Starts republishing `state` through `aggregator` every `interval`.
    #[must_use]
    pub fn spawn(
        state: Arc<TransferState>,
        aggregator: ProgressAggregator,
        interval: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let task_stop = stop.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = task_stop.cancelled() => break,
                    _ = ticker.tick() => {
                        aggregator.update(state.downloaded(), state.total());
                    }
                }
            }
            trace!("progress sampler stopped");
        });
        Self { stop, handle }
    }

    /// Stops the loop and waits for it to exit.
    pub async fn stop(self) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "progress sampler panicked");
        }
    }
}
