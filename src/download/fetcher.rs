//! Chunk fetcher: transfers one byte range into its offset of the output file.
//!
//! Each attempt opens its own write handle, seeks to the chunk's first byte
//! and streams the ranged response body there. Chunks never overlap, so
//! concurrent attempts never touch the same bytes and need no lock. Bytes are
//! credited to the shared [`TransferState`] as they are written; a failed
//! attempt's credit is withdrawn before the whole chunk is retried from its
//! first byte.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::error::{ChunkFailure, DownloadError};
use super::plan::Chunk;
use super::progress::TransferState;
use super::retry::{RetryDecision, RetryPolicy};

/// Everything a worker needs to fetch chunks of one job.
#[derive(Debug, Clone)]
pub(crate) struct ChunkFetcher {
    pub(crate) client: HttpClient,
    pub(crate) url: String,
    pub(crate) auth_header: Option<String>,
    pub(crate) output: PathBuf,
    pub(crate) buffer_size: usize,
    pub(crate) retry: RetryPolicy,
    pub(crate) state: Arc<TransferState>,
    pub(crate) cancel: CancellationToken,
}

impl ChunkFetcher {
    /// Fetches `chunk`, retrying failed attempts under the retry policy.
    ///
    /// Returns `Err` with a `Cancelled` source as soon as cancellation is
    /// observed, or with the last attempt's error once retries are exhausted.
    #[instrument(skip(self), fields(index = chunk.index, start = chunk.start, end = chunk.end))]
    pub(crate) async fn fetch(&self, chunk: Chunk) -> Result<(), ChunkFailure> {
        let mut attempt = 1u32;

        loop {
            let mut credited = 0u64;
            let error = match self.fetch_once(&chunk, &mut credited).await {
                Ok(()) => {
                    debug!(attempt, "chunk complete");
                    return Ok(());
                }
                Err(error) => error,
            };

            if error.is_cancelled() || self.cancel.is_cancelled() {
                return Err(cancelled(&chunk, attempt));
            }

            match self.retry.should_retry(attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    // The retry restarts at chunk.start; undo this attempt's credit.
                    self.state.sub_bytes(credited);
                    info!(
                        index = chunk.index,
                        attempt = next_attempt,
                        max_attempts = self.retry.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying chunk"
                    );
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return Err(cancelled(&chunk, attempt)),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(index = chunk.index, attempts = attempt, %reason, error = %error, "chunk failed");
                    return Err(ChunkFailure {
                        index: chunk.index,
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }

    /// One attempt at the full span of `chunk`.
    ///
    /// `credited` accumulates the bytes credited to the shared counter so the
    /// caller can withdraw them if the attempt fails part way.
    async fn fetch_once(&self, chunk: &Chunk, credited: &mut u64) -> Result<(), DownloadError> {
        let response = self
            .client
            .get_range(&self.url, self.auth_header.as_deref(), chunk, &self.cancel)
            .await?;

        // A 200 body starts at byte 0; it only lines up with a chunk that does too.
        if response.status() == StatusCode::OK && chunk.start != 0 {
            return Err(DownloadError::RangeIgnored {
                index: chunk.index,
                start: chunk.start,
            });
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(&self.output)
            .await
            .map_err(|e| DownloadError::io(&self.output, e))?;
        file.seek(SeekFrom::Start(chunk.start))
            .await
            .map_err(|e| DownloadError::io(&self.output, e))?;
        let mut writer = BufWriter::with_capacity(self.buffer_size.max(1), file);

        let expected = chunk.len();
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while written < expected {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
                next = stream.next() => next,
            };
            let Some(frame) = next else {
                break;
            };
            let bytes = frame.map_err(|e| DownloadError::from_reqwest(&self.url, e))?;

            // Never write past the chunk's last byte.
            let remaining = expected - written;
            let take = usize::try_from(remaining).map_or(bytes.len(), |r| r.min(bytes.len()));
            writer
                .write_all(&bytes[..take])
                .await
                .map_err(|e| DownloadError::io(&self.output, e))?;

            let take = take as u64;
            written += take;
            *credited += take;
            self.state.add_bytes(take);
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(&self.output, e))?;

        if written < expected {
            return Err(DownloadError::incomplete_chunk(chunk.index, written, expected));
        }
        Ok(())
    }
}

fn cancelled(chunk: &Chunk, attempts: u32) -> ChunkFailure {
    ChunkFailure {
        index: chunk.index,
        attempts,
        source: DownloadError::Cancelled,
    }
}
