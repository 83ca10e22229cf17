//! Room messaging layer for `MeshChat`.
//!
//! A [`ChatRoom`] turns one broadcast topic into a chat room with a typed
//! message protocol. It owns the topic exclusively and runs two loops:
//!
//! - the **inbound loop** decodes payloads from the topic, discards the
//!   local node's own echoes, routes text to the inbound queue and file
//!   chunks through the reassembler;
//! - the **outbound loop** drains the outbound queue, stamps each entry
//!   with the local identity and current username, and publishes it.
//!
//! Both loops stop on the room's cancellation token. [`ChatRoom::leave`]
//! fires the token, waits (bounded) for both loops, and closes the topic;
//! it is idempotent, and every operation after it fails explicitly rather
//! than hanging.

pub mod switcher;

mod receive;
mod send;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use meshchat_proto::assembler::CompletedFile;
use meshchat_proto::chunk::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE};
use meshchat_proto::codec::CodecError;
use meshchat_proto::message::TextMessage;

use crate::mesh::{JoinError, MeshNode, PeerId, PublishError, Topic};

/// Display name used when the caller provides an empty username.
pub const GUEST_USERNAME: &str = "guest";

/// Room joined when the caller provides an empty room name.
pub const DEFAULT_ROOM: &str = "lobby";

/// Bounded wait for each room loop to observe cancellation during leave.
const LEAVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Category tag for a [`LogEntry`], rendered as the line's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    /// Informational event.
    Info,
    /// Contained error (decode failure, publish failure, bad chunk).
    Error,
    /// Unrecognized command or missing argument.
    BadCommand,
    /// Room switch announcement.
    RoomChange,
    /// Room switch failure.
    JumpError,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
            Self::BadCommand => write!(f, "badcmd"),
            Self::RoomChange => write!(f, "roomchange"),
            Self::JumpError => write!(f, "jumperr"),
        }
    }
}

/// A transient, user-visible log line. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// What kind of event this is.
    pub category: LogCategory,
    /// Human-readable description.
    pub message: String,
}

impl LogEntry {
    /// Creates a log entry with an explicit category.
    pub fn new(category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    /// Creates an `info` entry.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogCategory::Info, message)
    }

    /// Creates an `error` entry.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogCategory::Error, message)
    }
}

/// Tunables for a single room.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity of the inbound, outbound, log and file queues.
    pub channel_capacity: usize,
    /// File transfer chunk size in bytes.
    pub chunk_size: usize,
    /// Sender-enforced ceiling on file size in bytes.
    pub max_file_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Error returned by room operations after the room has been left.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room has been left; its queues are closed.
    #[error("room has been left")]
    Closed,
}

/// Errors that can occur when sending a file.
///
/// No chunk is published unless the file was read completely and passed
/// the size ceiling, so a failing send never starts a partial transfer.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The file could not be read.
    #[error("unable to read file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file exceeds the configured size ceiling.
    #[error("file size {size} bytes exceeds the maximum allowed {max} bytes")]
    TooLarge {
        /// Actual file size in bytes.
        size: usize,
        /// Configured ceiling in bytes.
        max: usize,
    },

    /// The path has no final file name component.
    #[error("path has no file name: {0}")]
    NoFileName(PathBuf),

    /// A chunk failed to serialize.
    #[error("failed to encode file chunk: {0}")]
    Encode(#[from] CodecError),

    /// A chunk failed to publish; the transfer is abandoned.
    #[error("failed to publish file chunk: {0}")]
    Publish(#[from] PublishError),
}

/// One event from a room's consumer queues, multiplexed for the dispatcher.
#[derive(Debug)]
pub enum RoomEvent {
    /// A text message from a peer arrived on the inbound queue.
    Message(TextMessage),
    /// A log entry was produced by one of the room loops.
    Log(LogEntry),
    /// A file transfer completed reassembly.
    FileReceived(CompletedFile),
    /// The room's queues have closed; no more events will arrive.
    Closed,
}

/// A joined chat room backed by one broadcast topic.
///
/// The room owns its topic and loop lifetimes exclusively. Dropping the
/// room without calling [`leave`](Self::leave) still stops both loops
/// (the cancellation token closes with its sender), but `leave` is the
/// orderly path: it waits for the loops and closes the topic.
pub struct ChatRoom<T: Topic> {
    room_name: String,
    username: Arc<RwLock<String>>,
    local_id: PeerId,
    topic: Arc<T>,
    config: RoomConfig,
    outbound_tx: mpsc::Sender<String>,
    log_tx: mpsc::Sender<LogEntry>,
    messages_rx: mpsc::Receiver<TextMessage>,
    logs_rx: mpsc::Receiver<LogEntry>,
    files_rx: mpsc::Receiver<CompletedFile>,
    cancel_tx: watch::Sender<bool>,
    inbound_task: Option<JoinHandle<()>>,
    outbound_task: Option<JoinHandle<()>>,
    left: bool,
}

impl<T: Topic> ChatRoom<T> {
    /// Joins a room with default [`RoomConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`JoinError`] if the underlying topic join fails.
    pub async fn join<N>(node: &N, username: &str, room: &str) -> Result<Self, JoinError>
    where
        N: MeshNode<Topic = T>,
    {
        Self::join_with_config(node, username, room, RoomConfig::default()).await
    }

    /// Joins a room: resolves name defaults, joins the `chatroom-{name}`
    /// topic, triggers a discovery announcement and starts both loops.
    ///
    /// An empty username defaults to [`GUEST_USERNAME`]; an empty room
    /// name defaults to [`DEFAULT_ROOM`].
    ///
    /// # Errors
    ///
    /// Returns [`JoinError`] if the underlying topic join fails. Nothing
    /// is spawned in that case.
    pub async fn join_with_config<N>(
        node: &N,
        username: &str,
        room: &str,
        config: RoomConfig,
    ) -> Result<Self, JoinError>
    where
        N: MeshNode<Topic = T>,
    {
        let username = if username.is_empty() {
            GUEST_USERNAME.to_string()
        } else {
            username.to_string()
        };
        let room_name = if room.is_empty() {
            DEFAULT_ROOM.to_string()
        } else {
            room.to_string()
        };

        let topic = Arc::new(node.join_topic(&format!("chatroom-{room_name}")).await?);
        node.announce();

        let local_id = node.identity();
        let username = Arc::new(RwLock::new(username));

        let (outbound_tx, outbound_rx) = mpsc::channel(config.channel_capacity);
        let (msg_tx, messages_rx) = mpsc::channel(config.channel_capacity);
        let (log_tx, logs_rx) = mpsc::channel(config.channel_capacity);
        let (file_tx, files_rx) = mpsc::channel(config.channel_capacity);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let inbound_task = tokio::spawn(receive::inbound_loop(
            Arc::clone(&topic),
            local_id.clone(),
            msg_tx,
            file_tx,
            log_tx.clone(),
            cancel_rx.clone(),
        ));
        let outbound_task = tokio::spawn(send::outbound_loop(
            Arc::clone(&topic),
            local_id.clone(),
            Arc::clone(&username),
            outbound_rx,
            log_tx.clone(),
            cancel_rx,
        ));

        tracing::info!(room = %room_name, peer = %local_id, "joined room");

        Ok(Self {
            room_name,
            username,
            local_id,
            topic,
            config,
            outbound_tx,
            log_tx,
            messages_rx,
            logs_rx,
            files_rx,
            cancel_tx,
            inbound_task: Some(inbound_task),
            outbound_task: Some(outbound_task),
            left: false,
        })
    }

    /// The room's display name (without the topic prefix).
    #[must_use]
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// The current local display name.
    #[must_use]
    pub fn username(&self) -> String {
        self.username.read().clone()
    }

    /// Changes the local display name used on subsequently sent messages.
    /// Messages already enqueued or sent are unaffected.
    pub fn update_username(&self, name: &str) {
        *self.username.write() = name.to_string();
    }

    /// The local node's identity on the mesh.
    #[must_use]
    pub const fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Snapshot of the peers currently in this room (excluding self).
    #[must_use]
    pub fn peers(&self) -> Vec<PeerId> {
        self.topic.list_peers()
    }

    /// Enqueues a text message for the outbound loop.
    ///
    /// Enqueue order is publish order. Blocks only when the outbound
    /// queue is at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] once the room has been left.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), RoomError> {
        self.outbound_tx
            .send(text.into())
            .await
            .map_err(|_| RoomError::Closed)
    }

    /// Waits for the next event on any of the room's consumer queues.
    ///
    /// Returns [`RoomEvent::Closed`] once the inbound queue has closed
    /// (after [`leave`](Self::leave), or if the subscription died).
    pub async fn next_event(&mut self) -> RoomEvent {
        tokio::select! {
            maybe = self.messages_rx.recv() => maybe.map_or(RoomEvent::Closed, RoomEvent::Message),
            Some(entry) = self.logs_rx.recv() => RoomEvent::Log(entry),
            Some(file) = self.files_rx.recv() => RoomEvent::FileReceived(file),
            else => RoomEvent::Closed,
        }
    }

    /// Leaves the room: fires the cancellation token, waits (bounded) for
    /// both loops to observe it, and closes the topic.
    ///
    /// Idempotent — a second call returns immediately. After leaving,
    /// [`send_text`](Self::send_text) returns [`RoomError::Closed`] and
    /// [`send_file`](Self::send_file) fails on its first publish.
    pub async fn leave(&mut self) {
        if self.left {
            return;
        }
        self.left = true;

        tracing::info!(room = %self.room_name, "leaving room");
        let _ = self.cancel_tx.send(true);

        for task in [self.inbound_task.take(), self.outbound_task.take()]
            .into_iter()
            .flatten()
        {
            if tokio::time::timeout(LEAVE_TIMEOUT, task).await.is_err() {
                tracing::warn!(room = %self.room_name, "room loop did not stop within the leave timeout");
            }
        }

        self.topic.close();
    }
}
