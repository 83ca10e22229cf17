//! Mesh networking collaborators for `MeshChat`.
//!
//! Defines the [`MeshNode`] and [`Topic`] traits that the room layer
//! consumes. Peer identity, transport security, connection management and
//! the pubsub fabric itself all live behind these traits — the chat layer
//! only sees an opaque broadcast topic per room.
//!
//! Concrete implementations:
//! - [`local::LocalMesh`] — in-process broadcast fabric for tests and the
//!   single-process demo mode

pub mod local;

use std::fmt;

/// Unique identifier for a peer on the mesh.
///
/// In a real deployment this is derived from the node's cryptographic
/// identity. The chat layer treats it as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// Create a new peer identifier from a string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this peer ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return a shortened form (the last 8 characters) for display.
    #[must_use]
    pub fn short(&self) -> &str {
        let len = self.0.len();
        &self.0[len.saturating_sub(8)..]
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when joining a topic.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The mesh node has been shut down; no new topics can be joined.
    #[error("mesh node is shut down")]
    NodeClosed,

    /// The underlying transport rejected the join or subscribe.
    #[error("failed to join topic '{topic}': {reason}")]
    Topic {
        /// The topic that was being joined.
        topic: String,
        /// Transport-level failure description.
        reason: String,
    },
}

/// Errors that can occur when publishing on a topic.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The topic has been closed locally.
    #[error("topic is closed")]
    Closed,

    /// The underlying transport failed to send.
    #[error("publish failed: {0}")]
    Transport(String),
}

/// Errors that can occur when receiving from a topic.
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    /// The topic or its subscription has been closed.
    #[error("topic is closed")]
    Closed,
}

/// A handle to a node participating in the mesh.
///
/// Supplied by the networking layer; the chat layer uses it to join room
/// topics and to trigger peer discovery.
pub trait MeshNode: Send + Sync + 'static {
    /// The topic type produced by [`join_topic`](Self::join_topic).
    type Topic: Topic;

    /// Returns this node's identity on the mesh.
    fn identity(&self) -> PeerId;

    /// Joins the named broadcast topic and subscribes to it.
    fn join_topic(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Self::Topic, JoinError>> + Send;

    /// Triggers a peer-discovery announcement. Fire-and-forget.
    fn announce(&self);
}

/// An opaque broadcast topic capability.
///
/// All subscribers receive all published messages — including the
/// publisher itself, which must filter out its own echoes.
pub trait Topic: Send + Sync + 'static {
    /// Publishes a payload to every subscriber of this topic.
    ///
    /// Best-effort broadcast: a successful return means the payload was
    /// handed to the fabric, not that any peer received it.
    fn publish(
        &self,
        payload: &[u8],
    ) -> impl std::future::Future<Output = Result<(), PublishError>> + Send;

    /// Receives the next message published on this topic.
    ///
    /// Blocks asynchronously until a message arrives or the topic is
    /// closed. Returns the raw payload and the transport-level sender
    /// identity.
    fn next_message(
        &self,
    ) -> impl std::future::Future<Output = Result<(Vec<u8>, PeerId), TopicError>> + Send;

    /// Snapshot of the peers currently subscribed to this topic,
    /// excluding the local peer.
    fn list_peers(&self) -> Vec<PeerId>;

    /// Closes the topic: unsubscribes and releases fabric resources.
    /// Idempotent; wakes any blocked [`next_message`](Self::next_message).
    fn close(&self);
}
