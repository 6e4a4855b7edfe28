//! Error types for the download module.
//!
//! [`DownloadError`] describes why a single request (probe, chunk attempt,
//! whole-file stream) failed. [`TransferError`] describes how a whole job
//! ended when it did not complete.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single request or chunk attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response or an unexpected status for the request kind.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing the output.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The metadata request did not reveal a usable size.
    #[error("server did not return Content-Length for {url}")]
    MissingContentLength {
        /// The probed URL.
        url: String,
    },

    /// The body ended before the requested span was fully written.
    #[error("incomplete chunk {index}: got {received} bytes, expected {expected}")]
    IncompleteChunk {
        /// Chunk ordinal.
        index: usize,
        /// Bytes written before the body ended.
        received: u64,
        /// Bytes the chunk spans.
        expected: u64,
    },

    /// Written size does not match the expected resource size.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Output path that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// The server answered a ranged request with the whole resource.
    #[error("server ignored range request for chunk {index} starting at byte {start}")]
    RangeIgnored {
        /// Chunk ordinal.
        index: usize,
        /// First byte of the chunk.
        start: u64,
    },

    /// The job's cancellation token fired while the request was in flight.
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Maps a reqwest error to `Timeout` or `Network`.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a missing-size error.
    pub fn missing_content_length(url: impl Into<String>) -> Self {
        Self::MissingContentLength { url: url.into() }
    }

    /// Creates a short-read error for a chunk.
    pub fn incomplete_chunk(index: usize, received: u64, expected: u64) -> Self {
        Self::IncompleteChunk {
            index,
            received,
            expected,
        }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Returns true when the error is the cancellation outcome.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A chunk that exhausted its retry budget.
#[derive(Debug, Error)]
#[error("chunk {index} failed after {attempts} attempts (retries exhausted): {source}")]
pub struct ChunkFailure {
    /// Chunk ordinal.
    pub index: usize,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Error from the last attempt.
    #[source]
    pub source: DownloadError,
}

/// How a transfer job ended when it did not complete.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Capability probe failed; nothing was transferred.
    #[error("probe failed: {0}")]
    Probe(#[source] DownloadError),

    /// The output file could not be created.
    #[error("failed to create output file {path}: {source}")]
    Output {
        /// Output path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// One or more chunks exhausted their retries.
    #[error("download failed with {failed} of {total} chunks failing: {first}")]
    ChunksFailed {
        /// Number of chunks that failed terminally.
        failed: usize,
        /// Number of planned chunks.
        total: usize,
        /// First failure recorded.
        #[source]
        first: ChunkFailure,
    },

    /// Workers stopped without resolving every chunk (a worker task panicked).
    #[error("transfer stopped with {completed} of {total} chunks written")]
    Incomplete {
        /// Chunks fully written.
        completed: usize,
        /// Number of planned chunks.
        total: usize,
    },

    /// The single-stream fallback failed.
    #[error("single-stream download failed: {0}")]
    Stream(#[source] DownloadError),

    /// The caller cancelled the job.
    #[error("download cancelled")]
    Cancelled,
}

impl TransferError {
    /// Returns true when the job was cancelled rather than failing.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the
// URL or path context the source errors do not carry.
