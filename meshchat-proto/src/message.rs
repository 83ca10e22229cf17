//! Wire format message types for `MeshChat` rooms.
//!
//! Every payload published on a room topic is a serialized [`RoomMessage`].
//! The enum variant is the wire-level discriminant: a text message carries
//! only text fields, a file chunk carries only chunk fields, so neither kind
//! drags along unused optional fields.

use serde::{Deserialize, Serialize};

/// A plain text chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// The message body.
    pub text: String,
    /// Sender's peer identity, as claimed on the wire.
    pub sender_id: String,
    /// Sender's display name at the time of sending.
    pub sender_name: String,
}

/// One slice of a file transfer.
///
/// A file is split into `total_chunks` fixed-size slices; each slice is
/// published as its own `FileChunk`. Receivers reassemble by
/// `(file_name, sender_id)` and must not assume delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunk {
    /// Base name of the file being transferred.
    pub file_name: String,
    /// Sender's peer identity, as claimed on the wire.
    pub sender_id: String,
    /// Sender's display name at the time of sending.
    pub sender_name: String,
    /// Zero-based index of this chunk.
    pub chunk_index: u32,
    /// Total number of chunks in the transfer. Constant per transfer.
    pub total_chunks: u32,
    /// The chunk payload bytes.
    pub chunk_data: Vec<u8>,
}

/// Error returned when a [`FileChunk`] violates the chunk protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkValidationError {
    /// `total_chunks` is zero; a transfer always has at least one chunk.
    #[error("total_chunks must be at least 1")]
    ZeroTotalChunks,
    /// `chunk_index` is outside `[0, total_chunks)`.
    #[error("chunk index {index} out of range (total {total})")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// The transfer's chunk count.
        total: u32,
    },
}

impl FileChunk {
    /// Validates the chunk header invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkValidationError::ZeroTotalChunks`] if `total_chunks`
    /// is 0, or [`ChunkValidationError::IndexOutOfRange`] if
    /// `chunk_index >= total_chunks`.
    pub const fn validate(&self) -> Result<(), ChunkValidationError> {
        if self.total_chunks == 0 {
            return Err(ChunkValidationError::ZeroTotalChunks);
        }
        if self.chunk_index >= self.total_chunks {
            return Err(ChunkValidationError::IndexOutOfRange {
                index: self.chunk_index,
                total: self.total_chunks,
            });
        }
        Ok(())
    }
}

/// Top-level room message, the unit of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomMessage {
    /// A text chat message.
    Text(TextMessage),
    /// One chunk of a file transfer.
    File(FileChunk),
}

impl RoomMessage {
    /// Returns the sender identity claimed on the wire.
    #[must_use]
    pub fn sender_id(&self) -> &str {
        match self {
            Self::Text(msg) => &msg.sender_id,
            Self::File(chunk) => &chunk.sender_id,
        }
    }

    /// Returns the sender display name claimed on the wire.
    #[must_use]
    pub fn sender_name(&self) -> &str {
        match self {
            Self::Text(msg) => &msg.sender_name,
            Self::File(chunk) => &chunk.sender_name,
        }
    }
}
