//! Inbound loop: topic payloads to typed room queues.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use meshchat_proto::assembler::{CompletedFile, FileAssembler};
use meshchat_proto::codec;
use meshchat_proto::message::{RoomMessage, TextMessage};

use crate::mesh::{PeerId, Topic};

use super::LogEntry;

/// Receives from the topic until cancelled or the subscription closes.
///
/// Self-originated messages are dropped here: the broadcast fabric echoes
/// every publish back to the publisher, and the UI already rendered the
/// local copy. Decode failures and chunk protocol violations are contained
/// — they produce a log entry and the loop keeps going. When the loop
/// exits it drops its queue senders, which closes the inbound queue and
/// tells consumers that no more messages will arrive.
pub(super) async fn inbound_loop<T: Topic>(
    topic: Arc<T>,
    local_id: PeerId,
    msg_tx: mpsc::Sender<TextMessage>,
    file_tx: mpsc::Sender<CompletedFile>,
    log_tx: mpsc::Sender<LogEntry>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut assembler = FileAssembler::new();

    loop {
        let next = tokio::select! {
            _ = cancel_rx.wait_for(|&cancelled| cancelled) => break,
            next = topic.next_message() => next,
        };

        let (bytes, from) = match next {
            Ok(received) => received,
            Err(error) => {
                tracing::warn!(error = %error, "room subscription closed unexpectedly");
                let _ = log_tx
                    .send(LogEntry::error("subscription closed unexpectedly"))
                    .await;
                break;
            }
        };

        if from == local_id {
            continue;
        }

        match codec::decode(&bytes) {
            Ok(RoomMessage::Text(message)) => {
                if msg_tx.send(message).await.is_err() {
                    break;
                }
            }
            Ok(RoomMessage::File(chunk)) => match assembler.ingest(chunk) {
                Ok(Some(file)) => {
                    tracing::debug!(
                        file = %file.file_name,
                        from = %file.sender_id,
                        bytes = file.bytes.len(),
                        "file transfer complete"
                    );
                    if file_tx.send(file).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(peer = %from, error = %error, "dropping file chunk");
                    let _ = log_tx
                        .send(LogEntry::error(format!("dropped bad file chunk: {error}")))
                        .await;
                }
            },
            Err(error) => {
                tracing::warn!(peer = %from, error = %error, "undecodable payload");
                let _ = log_tx
                    .send(LogEntry::error("failed to parse incoming message"))
                    .await;
            }
        }
    }
}
