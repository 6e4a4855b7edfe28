//! Constants for the download module (timeouts, sizing, progress cadence).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle read timeout between body frames (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of parallel range streams.
pub const DEFAULT_STREAMS: usize = 8;

/// Default nominal chunk size (16 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Default per-stream buffer size (128 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Planned chunks are capped at `streams * CHUNKS_PER_STREAM`.
pub const CHUNKS_PER_STREAM: usize = 4;

/// Interval at which the sampling loop republishes progress.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Idle connections kept per stream in the client pool.
pub const IDLE_CONNECTIONS_PER_STREAM: usize = 2;

/// Idle connection lifetime in the client pool.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
