//! Transfer job description and tuning parameters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_STREAMS, PROGRESS_INTERVAL};
use super::retry::RetryPolicy;

/// Tunable parameters for a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Number of concurrent range streams.
    pub streams: usize,
    /// Nominal chunk size in bytes.
    pub chunk_size: u64,
    /// Per-stream write buffer size in bytes.
    pub buffer_size: usize,
    /// Per-chunk retry policy.
    pub retry: RetryPolicy,
    /// Progress sampling interval.
    pub progress_interval: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            streams: DEFAULT_STREAMS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            retry: RetryPolicy::default(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// A resolved resource to materialize at a local path.
///
/// Built once by the caller and never mutated during the transfer.
#[derive(Debug, Clone)]
pub struct TransferJob {
    url: String,
    auth_header: Option<String>,
    output: PathBuf,
    display_id: Option<String>,
    known_size: Option<u64>,
    config: TransferConfig,
}

impl TransferJob {
    /// Creates a job with default tuning.
    #[must_use]
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            auth_header: None,
            output: output.into(),
            display_id: None,
            known_size: None,
            config: TransferConfig::default(),
        }
    }

    /// Sets the opaque `Authorization` header value sent with every request.
    #[must_use]
    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.auth_header = Some(value.into());
        self
    }

    /// Sets the label shown by progress displays.
    #[must_use]
    pub fn with_display_id(mut self, id: impl Into<String>) -> Self {
        self.display_id = Some(id.into());
        self
    }

    /// Supplies a size learned elsewhere (e.g. a remote stat).
    #[must_use]
    pub fn with_known_size(mut self, size: u64) -> Self {
        self.known_size = Some(size);
        self
    }

    /// Replaces the tuning parameters.
    #[must_use]
    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Resource URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Authorization header value, if any.
    #[must_use]
    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Output file path.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Display label; falls back to the output file name.
    #[must_use]
    pub fn display_id(&self) -> String {
        self.display_id.clone().unwrap_or_else(|| {
            self.output
                .file_name()
                .map_or_else(|| self.url.clone(), |n| n.to_string_lossy().into_owned())
        })
    }

    /// Size supplied by the caller, if any.
    #[must_use]
    pub fn known_size(&self) -> Option<u64> {
        self.known_size
    }

    /// Tuning parameters.
    #[must_use]
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}
