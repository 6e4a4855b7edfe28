//! Range-based concurrent file transfer library.
//!
//! This library materializes a single remote resource on local disk by
//! splitting it into byte ranges that are fetched concurrently and written
//! straight to their offsets in a preallocated output file, with per-range
//! retries, decoupled progress reporting and a single-stream fallback for
//! servers that ignore range requests.
//!
//! # Architecture
//!
//! - [`download`] - probe, chunk planner, chunk fetcher, worker pool and
//!   progress aggregation
//!
//! Callers hand the engine a resolved [`TransferJob`] and receive either a
//! [`TransferReport`] or a [`TransferError`], plus a live progress feed.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use download::{
    Chunk, ChunkFailure, DEFAULT_MAX_ATTEMPTS, DownloadError, HttpClient, ProbeResult,
    ProgressAggregator, ProgressFeed, ProgressSnapshot, RetryDecision, RetryPolicy, TransferConfig,
    TransferEngine, TransferError, TransferJob, TransferMode, TransferReport, plan_chunks,
    resolve_output_path,
};
