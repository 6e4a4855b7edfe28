//! Chunk planning: partitions a resource into contiguous inclusive byte ranges.

use super::constants::CHUNKS_PER_STREAM;

/// A contiguous, inclusive byte range planned as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Ordinal in emission order.
    pub index: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)]
impl Chunk {
    /// Number of bytes the chunk spans. Never zero.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Range` request header.
    #[must_use]
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Partitions `[0, total_size)` into chunks of roughly `chunk_size` bytes.
///
/// The number of chunks never exceeds `streams * 4`; when the nominal count
/// would, the chunk size grows to `ceil(total_size / cap)`. The last chunk is
/// clamped to `total_size - 1`. Returns an empty plan for `total_size == 0`.
#[must_use]
pub fn plan_chunks(total_size: u64, streams: usize, chunk_size: u64) -> Vec<Chunk> {
    if total_size == 0 {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    if total_size <= chunk_size {
        return vec![Chunk {
            index: 0,
            start: 0,
            end: total_size - 1,
        }];
    }

    let max_chunks = streams.max(1).saturating_mul(CHUNKS_PER_STREAM) as u64;
    let mut count = total_size.div_ceil(chunk_size);
    let mut size = chunk_size;
    if count > max_chunks {
        size = total_size.div_ceil(max_chunks);
        count = max_chunks;
    }

    let mut chunks = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    let mut start = 0u64;
    while start < total_size && (chunks.len() as u64) < count {
        let end = (start + size - 1).min(total_size - 1);
        chunks.push(Chunk {
            index: chunks.len(),
            start,
            end,
        });
        start = end + 1;
    }
    chunks
}
