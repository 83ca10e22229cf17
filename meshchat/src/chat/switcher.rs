//! Room lifecycle management: safe switching between rooms.
//!
//! The [`RoomSwitcher`] owns the active [`ChatRoom`] reference and is its
//! only writer; the dispatcher task owns the switcher, so the active room
//! can never change out from under a reader mid-iteration. A switch joins
//! the new room *before* leaving the old one — the session is never left
//! without a subscription — and the old room is torn down after a short
//! settle delay so in-flight queue drains can finish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::mesh::{JoinError, MeshNode};

use super::{ChatRoom, RoomConfig};

/// Default wait between activating the new room and leaving the old one.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Errors that can occur when switching rooms.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// A previous switch has not finished tearing down its old room.
    #[error("a room switch is already in progress")]
    SwitchInProgress,

    /// Joining the new room failed; the old room is untouched.
    #[error("could not join room: {0}")]
    Join(#[from] JoinError),
}

/// Owns the active room and performs join-before-leave switches.
pub struct RoomSwitcher<N: MeshNode> {
    node: Arc<N>,
    current: ChatRoom<N::Topic>,
    config: RoomConfig,
    settle_delay: Duration,
    switching: Arc<AtomicBool>,
}

impl<N: MeshNode> RoomSwitcher<N> {
    /// Creates a switcher managing `initial` as the active room.
    ///
    /// New rooms joined by [`switch_room`](Self::switch_room) reuse
    /// `config`.
    #[must_use]
    pub fn new(node: Arc<N>, initial: ChatRoom<N::Topic>, config: RoomConfig) -> Self {
        Self {
            node,
            current: initial,
            config,
            settle_delay: DEFAULT_SETTLE_DELAY,
            switching: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Overrides the settle delay (mainly for tests).
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// The active room.
    #[must_use]
    pub const fn current(&self) -> &ChatRoom<N::Topic> {
        &self.current
    }

    /// Mutable access to the active room (for queue consumption).
    pub const fn current_mut(&mut self) -> &mut ChatRoom<N::Topic> {
        &mut self.current
    }

    /// Whether a switch is still tearing down its old room.
    #[must_use]
    pub fn is_switching(&self) -> bool {
        self.switching.load(Ordering::SeqCst)
    }

    /// Switches the active room to `new_name`.
    ///
    /// Joins the new room first; on failure the old room is untouched and
    /// the session keeps running. On success the new room becomes active
    /// immediately, and a background task leaves the old room after the
    /// settle delay. Only one switch may be in flight: until the old room
    /// has been left, further switch requests are rejected rather than
    /// interleaved.
    ///
    /// # Errors
    ///
    /// [`SwitchError::SwitchInProgress`] if a switch is still in flight,
    /// or [`SwitchError::Join`] if the new room cannot be joined.
    pub async fn switch_room(&mut self, new_name: &str) -> Result<(), SwitchError> {
        if self
            .switching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SwitchError::SwitchInProgress);
        }

        let username = self.current.username();
        let joined =
            ChatRoom::join_with_config(self.node.as_ref(), &username, new_name, self.config.clone())
                .await;

        let new_room = match joined {
            Ok(room) => room,
            Err(error) => {
                self.switching.store(false, Ordering::SeqCst);
                return Err(SwitchError::Join(error));
            }
        };

        let mut old = std::mem::replace(&mut self.current, new_room);
        tracing::info!(
            from = %old.room_name(),
            to = %self.current.room_name(),
            "switched active room"
        );

        let switching = Arc::clone(&self.switching);
        let settle = self.settle_delay;
        tokio::spawn(async move {
            // Settle: let in-flight queue drains on the old room finish.
            tokio::time::sleep(settle).await;
            old.leave().await;
            switching.store(false, Ordering::SeqCst);
        });

        Ok(())
    }

    /// Leaves the active room and consumes the switcher. Terminal.
    pub async fn shutdown(mut self) {
        self.current.leave().await;
    }
}
