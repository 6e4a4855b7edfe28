//! HTTP client wrapper for probing and fetching a resource.
//!
//! This module provides the `HttpClient` struct which issues the metadata
//! probe, ranged chunk requests and whole-resource requests, attaching the
//! job's opaque `Authorization` value and honoring the job's cancellation
//! token while a request is in flight.

use std::time::Duration;

use reqwest::header::{ACCEPT_RANGES, AUTHORIZATION, CONTENT_LENGTH, RANGE};
use reqwest::{Client, Method, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_STREAMS, IDLE_CONNECTIONS_PER_STREAM, POOL_IDLE_TIMEOUT,
    READ_TIMEOUT_SECS,
};
use super::error::DownloadError;
use super::plan::Chunk;
use crate::user_agent;

/// What the metadata request revealed about a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Size from `Content-Length`, when present and parseable.
    pub content_length: Option<u64>,
    /// Whether the server advertised `Accept-Ranges: bytes`.
    pub supports_ranges: bool,
}

/// HTTP client for range-based transfers.
///
/// Create once per job and clone freely; clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use rangeget_core::download::HttpClient;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let probe = client
///     .probe("https://example.com/video.mp4", None, &CancellationToken::new())
///     .await?;
/// println!("size: {:?}, ranges: {}", probe.content_length, probe.supports_ranges);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts and pool sizing.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes between body frames
    /// - Idle pool: two connections per default stream
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_settings(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, DEFAULT_STREAMS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with explicit timeouts and a pool sized for `streams`.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn with_settings(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
        streams: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .pool_max_idle_per_host(streams.max(1) * IDLE_CONNECTIONS_PER_STREAM)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .user_agent(user_agent::default_download_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Issues a metadata-only request for size and range support.
    ///
    /// A missing or non-`bytes` `Accept-Ranges` value is reported, not
    /// treated as an error.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails, the
    /// server answers with a non-success status, or `cancel` fires.
    #[instrument(skip(self, auth_header, cancel), fields(url = %url))]
    pub async fn probe(
        &self,
        url: &str,
        auth_header: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ProbeResult, DownloadError> {
        let response = self
            .send_request(Method::HEAD, url, auth_header, None, cancel)
            .await?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        let headers = response.headers();
        // Read the header directly: body size hints are always zero for HEAD.
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let supports_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));

        debug!(?content_length, supports_ranges, "probe complete");
        Ok(ProbeResult {
            content_length,
            supports_ranges,
        })
    }

    /// Requests exactly the bytes of `chunk`.
    ///
    /// Both `206 Partial Content` and `200 OK` are returned to the caller,
    /// which decides whether a `200` body is usable for the chunk.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::HttpStatus` for any other status, and the
    /// usual network/timeout/cancellation errors.
    pub async fn get_range(
        &self,
        url: &str,
        auth_header: Option<&str>,
        chunk: &Chunk,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        let range = chunk.range_header();
        let response = self
            .send_request(Method::GET, url, auth_header, Some(&range), cancel)
            .await?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT | StatusCode::OK => Ok(response),
            status => Err(DownloadError::http_status(url, status.as_u16())),
        }
    }

    /// Requests the whole resource; only `200 OK` is accepted.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::HttpStatus` for any other status, and the
    /// usual network/timeout/cancellation errors.
    pub async fn get(
        &self,
        url: &str,
        auth_header: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .send_request(Method::GET, url, auth_header, None, cancel)
            .await?;

        if response.status() == StatusCode::OK {
            Ok(response)
        } else {
            Err(DownloadError::http_status(url, response.status().as_u16()))
        }
    }

    async fn send_request(
        &self,
        method: Method,
        url: &str,
        auth_header: Option<&str>,
        range_header: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let mut request = self.client.request(method, parsed);
        if let Some(auth) = auth_header.filter(|value| !value.is_empty()) {
            request = request.header(AUTHORIZATION, auth);
        }
        if let Some(range) = range_header {
            request = request.header(RANGE, range);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DownloadError::Cancelled),
            result = request.send() => result.map_err(|e| DownloadError::from_reqwest(url, e)),
        }
    }
}
