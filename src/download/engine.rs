//! Transfer engine: coordinates one job from probe to final report.
//!
//! The engine probes the resource, then either plans byte-range chunks and
//! fans them out to a fixed pool of workers, or falls back to a single
//! sequential stream when the server does not accept ranges. A sampling task
//! republishes the shared byte counter for the whole transfer.
//!
//! # Example
//!
//! ```no_run
//! use rangeget_core::download::{HttpClient, ProgressAggregator, TransferEngine, TransferJob};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TransferEngine::new(HttpClient::new());
//! let job = TransferJob::new("https://example.com/video.mp4", "./video.mp4");
//! let progress = ProgressAggregator::new();
//! let report = engine.run(&job, &progress, &CancellationToken::new()).await?;
//! println!("{} bytes in {:?}", report.bytes, report.elapsed);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::error::{DownloadError, TransferError};
use super::fetcher::ChunkFetcher;
use super::job::TransferJob;
use super::plan::{Chunk, plan_chunks};
use super::progress::{ProgressAggregator, Sampler, TransferState};
use super::single::fetch_single_stream;

/// Which path materialized the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Concurrent byte-range chunks.
    Ranged,
    /// One sequential unranged stream.
    SingleStream,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ranged => write!(f, "ranged"),
            Self::SingleStream => write!(f, "single-stream"),
        }
    }
}

/// Summary of a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// Output file path.
    pub path: PathBuf,
    /// Bytes written (equals the resource size).
    pub bytes: u64,
    /// Chunks planned; 1 for the single-stream path.
    pub chunks: usize,
    /// Wall time from probe to completion.
    pub elapsed: Duration,
    /// Transfer path taken.
    pub mode: TransferMode,
}

/// Coordinator for a single transfer job.
///
/// # Concurrency Model
///
/// - Planned chunks are pushed into a channel sized to hold all of them,
///   then the sender is dropped so the queue is closed before any worker runs
/// - Exactly `streams` worker tasks pull from the shared receiver until it
///   drains or cancellation is observed
/// - A terminal chunk failure is recorded and the worker moves on; siblings
///   keep going
/// - Each chunk writes only its own byte span, so file writes take no lock
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    client: HttpClient,
}

impl TransferEngine {
    /// Creates an engine that issues all requests through `client`.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Returns the HTTP client used for requests.
    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Runs `job` to completion, publishing progress through `progress`.
    ///
    /// A partially written file is left on disk when the job fails.
    ///
    /// # Errors
    ///
    /// - [`TransferError::Probe`] if the size cannot be determined or the
    ///   metadata request fails
    /// - [`TransferError::Output`] if the output file cannot be created
    /// - [`TransferError::ChunksFailed`] if any chunk exhausted its retries
    /// - [`TransferError::Stream`] if the single-stream fallback fails
    /// - [`TransferError::Cancelled`] if `cancel` fires before completion
    #[instrument(skip(self, job, progress, cancel), fields(url = %job.url(), output = %job.output().display()))]
    pub async fn run(
        &self,
        job: &TransferJob,
        progress: &ProgressAggregator,
        cancel: &CancellationToken,
    ) -> Result<TransferReport, TransferError> {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        let started = Instant::now();

        let probe = self
            .client
            .probe(job.url(), job.auth_header(), cancel)
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    TransferError::Cancelled
                } else {
                    TransferError::Probe(e)
                }
            })?;

        let total = job
            .known_size()
            .or(probe.content_length)
            .filter(|size| *size > 0)
            .ok_or_else(|| TransferError::Probe(DownloadError::missing_content_length(job.url())))?;

        info!(
            total,
            supports_ranges = probe.supports_ranges,
            known_size = job.known_size().is_some(),
            "probe complete"
        );
        progress.update(0, total);

        let state = Arc::new(TransferState::new(total));
        let sampler = Sampler::spawn(
            Arc::clone(&state),
            progress.clone(),
            job.config().progress_interval,
        );

        let outcome = if probe.supports_ranges {
            self.run_ranged(job, total, &state, cancel)
                .await
                .map(|chunks| (chunks, TransferMode::Ranged))
        } else {
            info!("server does not accept byte ranges, using single stream");
            fetch_single_stream(
                &self.client,
                job.url(),
                job.auth_header(),
                job.output(),
                job.config().buffer_size,
                &state,
                cancel,
            )
            .await
            .map(|_| (1, TransferMode::SingleStream))
        };

        sampler.stop().await;
        progress.update(state.downloaded(), total);

        match outcome {
            Ok((chunks, mode)) => {
                let elapsed = started.elapsed();
                info!(
                    bytes = total,
                    chunks,
                    %mode,
                    elapsed_ms = elapsed.as_millis(),
                    "transfer complete"
                );
                Ok(TransferReport {
                    path: job.output().to_path_buf(),
                    bytes: total,
                    chunks,
                    elapsed,
                    mode,
                })
            }
            Err(TransferError::Cancelled) => {
                info!(downloaded = state.downloaded(), total, "transfer cancelled");
                Err(TransferError::Cancelled)
            }
            Err(error) => {
                warn!(error = %error, "transfer failed");
                Err(error)
            }
        }
    }

    /// Plans, preallocates and fans chunks out to the worker pool.
    ///
    /// Returns the number of chunks written.
    async fn run_ranged(
        &self,
        job: &TransferJob,
        total: u64,
        state: &Arc<TransferState>,
        cancel: &CancellationToken,
    ) -> Result<usize, TransferError> {
        let config = job.config();
        let streams = config.streams.max(1);
        let chunks = plan_chunks(total, streams, config.chunk_size.max(1));
        let chunk_count = chunks.len();
        info!(
            chunks = chunk_count,
            chunk_size = chunks.first().map_or(0, Chunk::len),
            streams,
            "planned chunks"
        );

        create_output(job, total).await?;

        let (tx, rx) = mpsc::channel(chunk_count.max(1));
        for chunk in chunks {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
        drop(tx);
        let queue = Arc::new(Mutex::new(rx));

        let fetcher = ChunkFetcher {
            client: self.client.clone(),
            url: job.url().to_owned(),
            auth_header: job.auth_header().map(str::to_owned),
            output: job.output().to_path_buf(),
            buffer_size: config.buffer_size,
            retry: config.retry.clone(),
            state: Arc::clone(state),
            cancel: cancel.clone(),
        };
        let completed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..streams)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let fetcher = fetcher.clone();
                let completed = Arc::clone(&completed);
                tokio::spawn(run_worker(worker, queue, fetcher, completed))
            })
            .collect();

        debug!(workers = handles.len(), "waiting for workers");
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "transfer worker panicked");
            }
        }

        let completed = completed.load(Ordering::SeqCst);
        if completed == chunk_count {
            return Ok(chunk_count);
        }
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let errors = state.take_errors();
        let failed = errors.len();
        match errors.into_iter().next() {
            Some(first) => Err(TransferError::ChunksFailed {
                failed,
                total: chunk_count,
                first,
            }),
            None => Err(TransferError::Incomplete {
                completed,
                total: chunk_count,
            }),
        }
    }
}

/// Creates (or truncates) the output and sizes it to `total`.
///
/// Only creation is fatal; a failed preallocation is logged and the writes
/// extend the file as they land.
async fn create_output(job: &TransferJob, total: u64) -> Result<(), TransferError> {
    let file = File::create(job.output())
        .await
        .map_err(|source| TransferError::Output {
            path: job.output().to_path_buf(),
            source,
        })?;
    if let Err(e) = file.set_len(total).await {
        warn!(path = %job.output().display(), total, error = %e, "preallocation failed, continuing");
    }
    Ok(())
}

/// Pulls chunks until the queue drains or cancellation is observed.
async fn run_worker(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<Chunk>>>,
    fetcher: ChunkFetcher,
    completed: Arc<AtomicUsize>,
) {
    loop {
        if fetcher.cancel.is_cancelled() {
            debug!(worker, "cancellation observed, worker exiting");
            return;
        }

        // The queue is closed and pre-filled: recv never waits for a producer.
        let next = queue.lock().await.recv().await;
        let Some(chunk) = next else {
            return;
        };

        match fetcher.fetch(chunk).await {
            Ok(()) => {
                completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(failure) if failure.source.is_cancelled() => return,
            Err(failure) => fetcher.state.add_error(failure),
        }
    }
}
