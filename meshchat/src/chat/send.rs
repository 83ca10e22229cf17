//! Outbound loop and file sending for [`ChatRoom`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};

use meshchat_proto::chunk;
use meshchat_proto::codec;
use meshchat_proto::message::{FileChunk, RoomMessage, TextMessage};

use crate::mesh::{PeerId, Topic};

use super::{ChatRoom, FileError, LogEntry};

/// Publishes entries from the outbound queue until cancelled.
///
/// Each entry is stamped with the local identity and the username at the
/// moment of publishing, so a `/u` rename affects exactly the messages
/// enqueued after it drains. A failed publish loses that one message and
/// the loop continues; the failure surfaces as a log entry, never as a
/// dead room.
pub(super) async fn outbound_loop<T: Topic>(
    topic: Arc<T>,
    local_id: PeerId,
    username: Arc<RwLock<String>>,
    mut outbound_rx: mpsc::Receiver<String>,
    log_tx: mpsc::Sender<LogEntry>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    loop {
        let text = tokio::select! {
            _ = cancel_rx.wait_for(|&cancelled| cancelled) => break,
            maybe = outbound_rx.recv() => match maybe {
                Some(text) => text,
                None => break,
            },
        };

        let message = RoomMessage::Text(TextMessage {
            text,
            sender_id: local_id.to_string(),
            sender_name: username.read().clone(),
        });

        let bytes = match codec::encode(&message) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(error = %error, "failed to serialize message");
                let _ = log_tx
                    .send(LogEntry::error("failed to serialize message"))
                    .await;
                continue;
            }
        };

        if let Err(error) = topic.publish(&bytes).await {
            tracing::warn!(error = %error, "failed to publish message");
            let _ = log_tx
                .send(LogEntry::error("failed to publish message"))
                .await;
        }
    }
}

impl<T: Topic> ChatRoom<T> {
    /// Sends a file to the room as a sequence of chunk messages.
    ///
    /// The file is read fully and checked against the size ceiling before
    /// the first chunk goes out, so a rejected or unreadable file never
    /// starts a partial transfer. Chunks are published in index order;
    /// the fabric may still deliver them in any order.
    ///
    /// # Errors
    ///
    /// Returns [`FileError`] if the file cannot be read, exceeds the
    /// ceiling, or a chunk fails to encode or publish.
    pub async fn send_file(&self, path: impl AsRef<Path>) -> Result<(), FileError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FileError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if bytes.len() > self.config.max_file_size {
            return Err(FileError::TooLarge {
                size: bytes.len(),
                max: self.config.max_file_size,
            });
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToString::to_string)
            .ok_or_else(|| FileError::NoFileName(path.to_path_buf()))?;

        let chunks = chunk::split(&bytes, self.config.chunk_size);
        let total_chunks = u32::try_from(chunks.len()).map_err(|_| FileError::TooLarge {
            size: bytes.len(),
            max: self.config.max_file_size,
        })?;

        let sender_name = self.username();
        let _ = self
            .log_tx
            .send(LogEntry::info(format!(
                "sending file {file_name} in {total_chunks} chunks"
            )))
            .await;
        tracing::info!(file = %file_name, chunks = total_chunks, "sending file");

        for (index, chunk_data) in chunks.into_iter().enumerate() {
            let message = RoomMessage::File(FileChunk {
                file_name: file_name.clone(),
                sender_id: self.local_id.to_string(),
                sender_name: sender_name.clone(),
                chunk_index: u32::try_from(index).unwrap_or(u32::MAX),
                total_chunks,
                chunk_data,
            });
            let bytes = codec::encode(&message)?;
            self.topic.publish(&bytes).await?;
        }

        Ok(())
    }
}
