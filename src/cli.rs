//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;
use rangeget_core::RetryPolicy;

/// Download one file over concurrent HTTP range requests.
///
/// The resource is split into byte ranges fetched in parallel and written
/// straight to their offsets in the output file. Servers without range
/// support are downloaded over a single stream.
#[derive(Parser, Debug)]
#[command(name = "rangeget")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the resource to download
    pub url: String,

    /// Output file, or a directory to place the URL's file name in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent range streams (1-64)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub streams: Option<u8>,

    /// Nominal chunk size in bytes (at least 65536)
    #[arg(long, value_parser = clap::value_parser!(u64).range(65_536..))]
    pub chunk_size: Option<u64>,

    /// Per-stream write buffer in bytes (4096-16777216)
    #[arg(long, value_parser = clap::value_parser!(u64).range(4_096..=16_777_216))]
    pub buffer_size: Option<u64>,

    /// Attempts per chunk, including the first (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Authorization header value sent with every request
    #[arg(long, value_name = "VALUE")]
    pub auth_header: Option<String>,

    /// Label shown on the progress bar (defaults to the file name)
    #[arg(long = "id", value_name = "LABEL")]
    pub display_id: Option<String>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Overlays flags given on the command line onto `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(streams) = self.streams {
            settings.transfer.streams = usize::from(streams);
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.transfer.chunk_size = chunk_size;
        }
        if let Some(buffer_size) = self.buffer_size.and_then(|b| usize::try_from(b).ok()) {
            settings.transfer.buffer_size = buffer_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            settings.transfer.retry = RetryPolicy::with_max_attempts(max_attempts);
        }
    }
}
