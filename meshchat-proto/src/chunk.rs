//! File chunking math for room file transfers.
//!
//! Senders split a file into fixed-size chunks before publishing; the
//! functions here define the canonical chunk count and split so that sender
//! and assembler always agree. A file whose size is an exact multiple of
//! the chunk size yields exactly `size / chunk_size` chunks — there is no
//! trailing empty chunk. The one exception is the empty file, which yields
//! a single empty chunk so the receiving side still observes a completed
//! transfer.

/// Default chunk size for file transfers (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;

/// Default sender-enforced ceiling on file size (100 KiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024;

/// Returns the number of chunks a payload of `len` bytes splits into.
///
/// `ceil(len / chunk_size)`, with a minimum of one chunk for the empty
/// payload.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
#[must_use]
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    assert!(chunk_size > 0, "chunk_size must be non-zero");
    len.div_ceil(chunk_size).max(1)
}

/// Splits `bytes` into chunks of at most `chunk_size` bytes.
///
/// Produces exactly [`chunk_count`] chunks; all but the last are full,
/// and the empty input produces one empty chunk.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
#[must_use]
pub fn split(bytes: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");
    if bytes.is_empty() {
        return vec![Vec::new()];
    }
    bytes.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}
