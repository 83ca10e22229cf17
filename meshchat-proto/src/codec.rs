//! Serialization and deserialization for the `MeshChat` room wire format.
//!
//! Room topics carry whole messages (the pubsub layer preserves message
//! boundaries), so no length-prefix framing is needed — each published
//! payload is one postcard-encoded [`RoomMessage`].

use crate::message::RoomMessage;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`RoomMessage`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the message cannot be serialized.
/// This does not happen for well-formed messages.
pub fn encode(message: &RoomMessage) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(message).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`RoomMessage`] from a byte slice using postcard.
///
/// Malformed input is rejected with an error value; decoding never panics.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<RoomMessage, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}
