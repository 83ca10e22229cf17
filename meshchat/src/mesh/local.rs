//! In-process mesh fabric for testing and single-process demo mode.
//!
//! One [`tokio::sync::broadcast`] channel per topic name simulates the
//! pubsub layer: every subscriber — including the publisher — receives
//! every published payload, matching the echo semantics of the real
//! fabric. A shared registry tracks which peers are subscribed to which
//! topic so [`Topic::list_peers`] can answer without any networking.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use super::{JoinError, MeshNode, PeerId, PublishError, Topic, TopicError};

/// Capacity of each per-topic broadcast channel.
const BROADCAST_CAPACITY: usize = 256;

/// Per-topic fabric state: the broadcast channel plus subscribed members.
///
/// Member counts handle the same peer joining one topic more than once
/// (e.g. switching back to a room before the old handle is closed).
struct TopicState {
    sender: broadcast::Sender<(PeerId, Vec<u8>)>,
    members: HashMap<PeerId, usize>,
}

/// Registry shared by every node and topic handle of one mesh.
struct MeshState {
    topics: Mutex<HashMap<String, TopicState>>,
    shutdown: AtomicBool,
}

/// An in-process mesh fabric.
///
/// Create one mesh per test or process, then hand out [`LocalNode`]s with
/// [`node`](Self::node). Nodes on the same mesh see each other's topics;
/// separate meshes are fully isolated.
#[derive(Clone)]
pub struct LocalMesh {
    state: Arc<MeshState>,
}

impl LocalMesh {
    /// Creates an empty mesh with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(MeshState {
                topics: Mutex::new(HashMap::new()),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a node handle with the given peer identity.
    #[must_use]
    pub fn node(&self, id: impl Into<String>) -> LocalNode {
        LocalNode {
            id: PeerId::new(id),
            state: Arc::clone(&self.state),
        }
    }

    /// Shuts the mesh down: existing topics keep working, but every
    /// subsequent [`MeshNode::join_topic`] fails with
    /// [`JoinError::NodeClosed`].
    pub fn shut_down(&self) {
        self.state.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Default for LocalMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// A node participating in a [`LocalMesh`].
pub struct LocalNode {
    id: PeerId,
    state: Arc<MeshState>,
}

impl MeshNode for LocalNode {
    type Topic = LocalTopic;

    fn identity(&self) -> PeerId {
        self.id.clone()
    }

    async fn join_topic(&self, name: &str) -> Result<LocalTopic, JoinError> {
        if self.state.shutdown.load(Ordering::SeqCst) {
            return Err(JoinError::NodeClosed);
        }

        let mut topics = self.state.topics.lock();
        let topic = topics
            .entry(name.to_string())
            .or_insert_with(|| TopicState {
                sender: broadcast::channel(BROADCAST_CAPACITY).0,
                members: HashMap::new(),
            });
        *topic.members.entry(self.id.clone()).or_insert(0) += 1;

        let receiver = topic.sender.subscribe();
        let (closed, _) = watch::channel(false);
        Ok(LocalTopic {
            name: name.to_string(),
            local_id: self.id.clone(),
            state: Arc::clone(&self.state),
            sender: topic.sender.clone(),
            receiver: tokio::sync::Mutex::new(receiver),
            closed,
        })
    }

    fn announce(&self) {
        // Discovery is implicit on an in-process fabric.
        tracing::debug!(peer = %self.id, "announce");
    }
}

/// A joined topic on a [`LocalMesh`].
pub struct LocalTopic {
    name: String,
    local_id: PeerId,
    state: Arc<MeshState>,
    sender: broadcast::Sender<(PeerId, Vec<u8>)>,
    receiver: tokio::sync::Mutex<broadcast::Receiver<(PeerId, Vec<u8>)>>,
    closed: watch::Sender<bool>,
}

impl Topic for LocalTopic {
    async fn publish(&self, payload: &[u8]) -> Result<(), PublishError> {
        if *self.closed.borrow() {
            return Err(PublishError::Closed);
        }
        // A send error only means there are no live subscribers; for a
        // best-effort broadcast that is not a failure.
        let _ = self.sender.send((self.local_id.clone(), payload.to_vec()));
        Ok(())
    }

    async fn next_message(&self) -> Result<(Vec<u8>, PeerId), TopicError> {
        let mut closed_rx = self.closed.subscribe();
        let mut receiver = self.receiver.lock().await;
        loop {
            tokio::select! {
                _ = closed_rx.wait_for(|&closed| closed) => return Err(TopicError::Closed),
                result = receiver.recv() => match result {
                    Ok((from, bytes)) => return Ok((bytes, from)),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(topic = %self.name, missed, "slow subscriber, dropping missed messages");
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(TopicError::Closed),
                },
            }
        }
    }

    fn list_peers(&self) -> Vec<PeerId> {
        let topics = self.state.topics.lock();
        topics.get(&self.name).map_or_else(Vec::new, |topic| {
            topic
                .members
                .keys()
                .filter(|peer| **peer != self.local_id)
                .cloned()
                .collect()
        })
    }

    fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let mut topics = self.state.topics.lock();
        if let Some(topic) = topics.get_mut(&self.name) {
            if let Some(count) = topic.members.get_mut(&self.local_id) {
                *count -= 1;
                if *count == 0 {
                    topic.members.remove(&self.local_id);
                }
            }
            if topic.members.is_empty() {
                topics.remove(&self.name);
            }
        }
    }
}

impl Drop for LocalTopic {
    fn drop(&mut self) {
        self.close();
    }
}
