//! Range-based concurrent download engine.
//!
//! This module materializes one remote resource on disk by splitting it into
//! byte ranges fetched concurrently, each written straight to its offset in
//! the output file.
//!
//! # Features
//!
//! - Capability probe for size and `Accept-Ranges` support
//! - Deterministic chunk planning bounded to four chunks per stream
//! - Per-chunk retry with exponential backoff (1s, 2s, 4s, 8s)
//! - Lock-free progress counter republished on a fixed interval
//! - Single-stream fallback for servers without range support
//! - Cancellation that interrupts requests, body reads and backoff sleeps
//!
//! # Example
//!
//! ```no_run
//! use rangeget_core::download::{HttpClient, ProgressAggregator, TransferEngine, TransferJob};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let job = TransferJob::new("https://example.com/disk.img", "./disk.img").with_display_id("disk");
//! let progress = ProgressAggregator::new();
//! let mut feed = progress.subscribe();
//! tokio::spawn(async move {
//!     while feed.changed().await.is_ok() {
//!         let snapshot = *feed.borrow();
//!         println!("{}/{}", snapshot.downloaded, snapshot.total);
//!     }
//! });
//! let report = TransferEngine::new(HttpClient::new())
//!     .run(&job, &progress, &CancellationToken::new())
//!     .await?;
//! println!("Downloaded: {}", report.path.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod fetcher;
mod filename;
mod job;
mod plan;
mod progress;
mod retry;
mod single;

pub use client::{HttpClient, ProbeResult};
pub use engine::{TransferEngine, TransferMode, TransferReport};
pub use error::{ChunkFailure, DownloadError, TransferError};
pub use filename::resolve_output_path;
pub use job::{TransferConfig, TransferJob};
pub use plan::{Chunk, plan_chunks};
pub use progress::{ProgressAggregator, ProgressFeed, ProgressSnapshot, Sampler, TransferState};
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryDecision, RetryPolicy};

// No module-local Result alias: signatures spell out `Result<T, DownloadError>`.
