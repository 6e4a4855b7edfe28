//! User-Agent string for transfer requests.

/// Product token prefix shared by all requests.
const PRODUCT: &str = "rangeget";

/// Default User-Agent for probe and fetch requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (multi-stream downloader)")
}
