//! Chunk splitting for blob uploads.
//!
//! Splitting happens after encryption: the boundaries are defined purely
//! by byte count over the ciphertext, never by content.

/// Maximum encrypted chunk size in bytes (10 MiB).
///
/// Fixed constant shared between client and server.
pub const MAX_BLOB_SIZE: usize = 10 * 1024 * 1024;

/// Split `data` into consecutive chunks of at most `max` bytes.
///
/// Yields `ceil(len / max)` chunks; concatenating them in order
/// reproduces `data` exactly. Empty input yields no chunks.
pub fn split_into_chunks(data: &[u8], max: usize) -> Vec<&[u8]> {
    assert!(max > 0, "chunk size must be positive");
    data.chunks(max).collect()
}
