//! Reassembly of file transfers from unordered chunk streams.
//!
//! The pubsub layer guarantees nothing about delivery order, so the
//! assembler accepts chunks in any permutation. Each in-flight transfer is
//! a slot array keyed by `(file_name, sender_id)`; the array is sized from
//! the first chunk seen and never resized. When every slot is filled the
//! transfer completes, the entry is removed, and the ordered concatenation
//! of the slots is returned.

use std::collections::HashMap;

use crate::message::{ChunkValidationError, FileChunk};

/// Upper bound on chunks per transfer, so a hostile `total_chunks` cannot
/// force an arbitrarily large slot allocation. At the default 4 KiB chunk
/// size this still admits transfers far beyond the default file ceiling.
pub const MAX_TRANSFER_CHUNKS: u32 = 16 * 1024;

/// A fully reassembled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFile {
    /// Base name of the transferred file.
    pub file_name: String,
    /// Peer identity of the sender.
    pub sender_id: String,
    /// Display name of the sender.
    pub sender_name: String,
    /// The reassembled contents.
    pub bytes: Vec<u8>,
}

/// Error returned when an incoming chunk violates the transfer protocol.
///
/// The offending chunk is dropped; the transfer entry it targeted (if any)
/// is left intact so the remaining chunks can still complete it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    /// The chunk header itself is invalid.
    #[error(transparent)]
    InvalidChunk(#[from] ChunkValidationError),
    /// The chunk claims more chunks than [`MAX_TRANSFER_CHUNKS`] allows.
    #[error("file '{file_name}': {total_chunks} chunks exceeds the transfer limit")]
    TooManyChunks {
        /// File the chunk claimed to belong to.
        file_name: String,
        /// Claimed chunk count.
        total_chunks: u32,
    },
    /// The chunk's `total_chunks` disagrees with the in-flight transfer.
    #[error("file '{file_name}': total_chunks changed from {expected} to {actual}")]
    TotalChunksMismatch {
        /// File the chunk claimed to belong to.
        file_name: String,
        /// Chunk count the transfer was created with.
        expected: u32,
        /// Chunk count claimed by the offending chunk.
        actual: u32,
    },
}

/// State for one in-flight transfer: one slot per expected chunk.
#[derive(Debug)]
struct Transfer {
    slots: Vec<Option<Vec<u8>>>,
}

impl Transfer {
    fn new(total_chunks: u32) -> Self {
        Self {
            slots: vec![None; total_chunks as usize],
        }
    }

    fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Ordered concatenation of all slots. Only valid once complete.
    fn into_bytes(self) -> Vec<u8> {
        self.slots.into_iter().flatten().flatten().collect()
    }
}

/// Reassembles files from unordered [`FileChunk`] streams.
///
/// Not thread-safe; each room's inbound loop owns its own assembler.
#[derive(Debug, Default)]
pub struct FileAssembler {
    transfers: HashMap<(String, String), Transfer>,
}

impl FileAssembler {
    /// Creates an assembler with no in-flight transfers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transfers currently awaiting chunks.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.transfers.len()
    }

    /// Ingests one chunk, returning the completed file if this chunk was
    /// the last missing piece.
    ///
    /// A duplicate of an already-filled slot overwrites it. A chunk that
    /// arrives after its transfer completed starts a fresh transfer under
    /// the same key rather than corrupting the finished one.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError`] if the chunk header is invalid or its
    /// `total_chunks` disagrees with the in-flight transfer. The chunk is
    /// dropped and existing state is untouched.
    pub fn ingest(&mut self, chunk: FileChunk) -> Result<Option<CompletedFile>, AssemblyError> {
        chunk.validate()?;
        if chunk.total_chunks > MAX_TRANSFER_CHUNKS {
            return Err(AssemblyError::TooManyChunks {
                file_name: chunk.file_name,
                total_chunks: chunk.total_chunks,
            });
        }

        let key = (chunk.file_name.clone(), chunk.sender_id.clone());
        let transfer = self
            .transfers
            .entry(key.clone())
            .or_insert_with(|| Transfer::new(chunk.total_chunks));

        let expected = u32::try_from(transfer.slots.len()).unwrap_or(u32::MAX);
        if chunk.total_chunks != expected {
            return Err(AssemblyError::TotalChunksMismatch {
                file_name: chunk.file_name,
                expected,
                actual: chunk.total_chunks,
            });
        }

        transfer.slots[chunk.chunk_index as usize] = Some(chunk.chunk_data);

        if transfer.is_complete() {
            // Remove first so a late duplicate starts a new transfer.
            let transfer = match self.transfers.remove(&key) {
                Some(t) => t,
                None => return Ok(None),
            };
            return Ok(Some(CompletedFile {
                file_name: chunk.file_name,
                sender_id: chunk.sender_id,
                sender_name: chunk.sender_name,
                bytes: transfer.into_bytes(),
            }));
        }
        Ok(None)
    }
}
