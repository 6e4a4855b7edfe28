//! Single-stream fallback for servers without byte-range support.
//!
//! One unranged request, one sequential write from offset 0. No retries: a
//! failed stream fails the job.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::client::HttpClient;
use super::error::{DownloadError, TransferError};
use super::progress::TransferState;

/// Streams the whole resource at `url` into a freshly created `output`.
///
/// Bytes are credited to `state` as they are written. The written count must
/// match `state.total()` exactly.
///
/// # Errors
///
/// - [`TransferError::Output`] if the file cannot be created
/// - [`TransferError::Cancelled`] if `cancel` fires first
/// - [`TransferError::Stream`] for request, write or size-mismatch failures
#[instrument(skip(client, auth_header, state, cancel), fields(url = %url, output = %output.display()))]
pub(crate) async fn fetch_single_stream(
    client: &HttpClient,
    url: &str,
    auth_header: Option<&str>,
    output: &Path,
    buffer_size: usize,
    state: &TransferState,
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let response = client
        .get(url, auth_header, cancel)
        .await
        .map_err(stream_error)?;

    let file = File::create(output)
        .await
        .map_err(|source| TransferError::Output {
            path: output.to_path_buf(),
            source,
        })?;
    let mut writer = BufWriter::with_capacity(buffer_size.max(1), file);

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransferError::Cancelled),
            next = stream.next() => next,
        };
        let Some(frame) = next else {
            break;
        };
        let bytes = frame.map_err(|e| stream_error(DownloadError::from_reqwest(url, e)))?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| stream_error(DownloadError::io(output, e)))?;
        let n = bytes.len() as u64;
        written += n;
        state.add_bytes(n);
    }

    writer
        .flush()
        .await
        .map_err(|e| stream_error(DownloadError::io(output, e)))?;

    if written != state.total() {
        return Err(stream_error(DownloadError::integrity(
            output,
            state.total(),
            written,
        )));
    }

    debug!(bytes = written, "single stream complete");
    Ok(written)
}

fn stream_error(error: DownloadError) -> TransferError {
    if error.is_cancelled() {
        TransferError::Cancelled
    } else {
        TransferError::Stream(error)
    }
}
