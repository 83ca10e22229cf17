//! Room switching tests: join-before-leave, settle teardown, single
//! switch in flight, and isolation between old and new rooms.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use meshchat::chat::switcher::{RoomSwitcher, SwitchError};
use meshchat::chat::{ChatRoom, RoomConfig, RoomEvent};
use meshchat::mesh::PeerId;
use meshchat::mesh::local::{LocalMesh, LocalNode, LocalTopic};
use meshchat_proto::message::TextMessage;

const WAIT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(200);

/// Joins `room` as `username` and wraps it in a switcher with a short
/// settle delay.
async fn switcher_for(
    node: Arc<LocalNode>,
    username: &str,
    room: &str,
) -> RoomSwitcher<LocalNode> {
    let initial = ChatRoom::join(node.as_ref(), username, room).await.unwrap();
    RoomSwitcher::new(node, initial, RoomConfig::default()).with_settle_delay(SETTLE)
}

/// Waits for the next text message, skipping log entries.
async fn next_text(room: &mut ChatRoom<LocalTopic>) -> TextMessage {
    loop {
        let event = timeout(WAIT, room.next_event())
            .await
            .expect("timed out waiting for a room event");
        match event {
            RoomEvent::Message(message) => return message,
            RoomEvent::Log(_) => {}
            other => panic!("unexpected room event: {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn switch_makes_the_new_room_active() {
    let mesh = LocalMesh::new();
    let node = Arc::new(mesh.node("peer-alice"));
    let mut switcher = switcher_for(node, "alice", "alpha").await;

    switcher.switch_room("beta").await.unwrap();
    assert_eq!(switcher.current().room_name(), "beta");
    assert_eq!(switcher.current().username(), "alice");

    switcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_switch_leaves_the_session_untouched() {
    let mesh = LocalMesh::new();
    let alice_node = Arc::new(mesh.node("peer-alice"));
    let bob_node = mesh.node("peer-bob");

    let mut switcher = switcher_for(alice_node, "alice", "alpha").await;
    let mut bob = ChatRoom::join(&bob_node, "bob", "alpha").await.unwrap();

    // New joins now fail; the active room must keep working.
    mesh.shut_down();

    let result = switcher.switch_room("beta").await;
    assert!(matches!(result, Err(SwitchError::Join(_))));
    assert_eq!(switcher.current().room_name(), "alpha");
    assert!(!switcher.is_switching());

    switcher.current().send_text("still here").await.unwrap();
    assert_eq!(next_text(&mut bob).await.text, "still here");

    bob.leave().await;
    switcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn messages_do_not_cross_rooms_after_a_switch() {
    let mesh = LocalMesh::new();
    let alice_node = Arc::new(mesh.node("peer-alice"));
    let bob_node = mesh.node("peer-bob");
    let charlie_node = mesh.node("peer-charlie");

    let mut switcher = switcher_for(alice_node, "alice", "alpha").await;
    let mut bob = ChatRoom::join(&bob_node, "bob", "alpha").await.unwrap();
    let charlie = ChatRoom::join(&charlie_node, "charlie", "beta")
        .await
        .unwrap();

    switcher.switch_room("beta").await.unwrap();

    // Sent on the old room after the switch: must never reach the new
    // room's queue.
    bob.send_text("late for alpha").await.unwrap();
    charlie.send_text("hello beta").await.unwrap();

    let received = next_text(switcher.current_mut()).await;
    assert_eq!(received.text, "hello beta");
    assert_eq!(received.sender_name, "charlie");

    let stray = timeout(Duration::from_millis(100), switcher.current_mut().next_event()).await;
    assert!(stray.is_err(), "old-room message leaked: {stray:?}");

    bob.leave().await;
    let mut charlie = charlie;
    charlie.leave().await;
    switcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn sending_on_the_new_room_works_during_settle() {
    let mesh = LocalMesh::new();
    let alice_node = Arc::new(mesh.node("peer-alice"));
    let charlie_node = mesh.node("peer-charlie");

    let mut switcher = switcher_for(alice_node, "alice", "alpha").await;
    let mut charlie = ChatRoom::join(&charlie_node, "charlie", "beta")
        .await
        .unwrap();

    switcher.switch_room("beta").await.unwrap();

    // The old room has not been left yet (settle pending) — sends on the
    // new room must already succeed.
    assert!(switcher.is_switching());
    switcher.current().send_text("early bird").await.unwrap();
    assert_eq!(next_text(&mut charlie).await.text, "early bird");

    charlie.leave().await;
    switcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn only_one_switch_may_be_in_flight() {
    let mesh = LocalMesh::new();
    let node = Arc::new(mesh.node("peer-alice"));
    let mut switcher = switcher_for(node, "alice", "alpha").await;

    switcher.switch_room("beta").await.unwrap();

    // The first switch is still settling; a second request is rejected,
    // not interleaved.
    let result = switcher.switch_room("gamma").await;
    assert!(matches!(result, Err(SwitchError::SwitchInProgress)));
    assert_eq!(switcher.current().room_name(), "beta");

    // Once the old room has been torn down, switching works again.
    tokio::time::sleep(SETTLE + Duration::from_millis(100)).await;
    assert!(!switcher.is_switching());
    switcher.switch_room("gamma").await.unwrap();
    assert_eq!(switcher.current().room_name(), "gamma");

    switcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn old_room_is_left_after_the_settle_delay() {
    let mesh = LocalMesh::new();
    let alice_node = Arc::new(mesh.node("peer-alice"));
    let bob_node = mesh.node("peer-bob");

    let mut switcher = switcher_for(alice_node, "alice", "alpha").await;
    let mut bob = ChatRoom::join(&bob_node, "bob", "alpha").await.unwrap();

    assert_eq!(bob.peers(), vec![PeerId::new("peer-alice")]);

    switcher.switch_room("beta").await.unwrap();

    // Still subscribed to alpha during the settle window.
    assert_eq!(bob.peers(), vec![PeerId::new("peer-alice")]);

    tokio::time::sleep(SETTLE + Duration::from_millis(100)).await;
    assert!(bob.peers().is_empty(), "old subscription leaked");
    assert!(!switcher.is_switching());

    bob.leave().await;
    switcher.shutdown().await;
}
