//! Dispatcher wiring tests: line handling, local echo, command effects,
//! and shutdown, driven through the public input/display channels.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use meshchat::chat::{ChatRoom, LogCategory, RoomConfig, RoomEvent};
use meshchat::dispatcher::{self, DispatcherConfig, DisplayEvent, UserInput};
use meshchat::mesh::local::{LocalMesh, LocalTopic};
use meshchat_proto::message::TextMessage;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    input_tx: mpsc::Sender<UserInput>,
    display_rx: mpsc::Receiver<DisplayEvent>,
    bob: ChatRoom<LocalTopic>,
}

/// Spawns a dispatcher for alice plus a raw room for bob, both in `lobby`.
///
/// Drains the initial `RoomChanged` / `UsernameChanged` pair so tests
/// start from a quiet channel.
async fn harness() -> Harness {
    let mesh = LocalMesh::new();
    let alice_node = Arc::new(mesh.node("peer-alice"));
    let bob_node = mesh.node("peer-bob");

    let bob = ChatRoom::join(&bob_node, "bob", "lobby").await.unwrap();

    let config = DispatcherConfig {
        // Long refresh so peer snapshots don't drown the asserted events.
        peer_refresh: Duration::from_secs(600),
        settle_delay: Duration::from_millis(200),
        download_dir: std::env::temp_dir(),
        channel_capacity: 64,
    };
    let (input_tx, mut display_rx) = dispatcher::spawn_dispatcher(
        alice_node,
        "alice",
        "lobby",
        RoomConfig::default(),
        config,
    )
    .await
    .unwrap();

    let first = timeout(WAIT, display_rx.recv()).await.unwrap().unwrap();
    assert!(matches!(first, DisplayEvent::RoomChanged { ref room_name } if room_name == "lobby"));
    let second = timeout(WAIT, display_rx.recv()).await.unwrap().unwrap();
    assert!(matches!(second, DisplayEvent::UsernameChanged { ref username } if username == "alice"));

    Harness {
        input_tx,
        display_rx,
        bob,
    }
}

impl Harness {
    async fn send_line(&self, line: &str) {
        self.input_tx
            .send(UserInput::Line(line.to_string()))
            .await
            .unwrap();
    }

    /// Receives display events until `pick` returns `Some`, skipping
    /// peer snapshots and anything else the predicate rejects.
    async fn expect<T>(&mut self, mut pick: impl FnMut(DisplayEvent) -> Option<T>) -> T {
        loop {
            let event = timeout(WAIT, self.display_rx.recv())
                .await
                .expect("timed out waiting for a display event")
                .expect("display channel closed");
            if let Some(found) = pick(event) {
                return found;
            }
        }
    }

    async fn next_text_at_bob(&mut self) -> TextMessage {
        loop {
            let event = timeout(WAIT, self.bob.next_event())
                .await
                .expect("timed out waiting for bob's room event");
            match event {
                RoomEvent::Message(message) => return message,
                RoomEvent::Log(_) => {}
                other => panic!("unexpected room event: {other:?}"),
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn submitted_line_is_echoed_and_published() {
    let mut h = harness().await;

    h.send_line("hello room").await;

    let (sender, text) = h
        .expect(|event| match event {
            DisplayEvent::SelfMessage { sender_name, text } => Some((sender_name, text)),
            _ => None,
        })
        .await;
    assert_eq!(sender, "alice");
    assert_eq!(text, "hello room");

    let received = h.next_text_at_bob().await;
    assert_eq!(received.text, "hello room");
    assert_eq!(received.sender_name, "alice");
}

#[tokio::test(start_paused = true)]
async fn peer_messages_are_forwarded_to_the_display() {
    let mut h = harness().await;

    h.bob.send_text("hi alice").await.unwrap();

    let (sender, text) = h
        .expect(|event| match event {
            DisplayEvent::PeerMessage { sender_name, text } => Some((sender_name, text)),
            _ => None,
        })
        .await;
    assert_eq!(sender, "bob");
    assert_eq!(text, "hi alice");
}

#[tokio::test(start_paused = true)]
async fn unknown_command_produces_badcmd_log() {
    let mut h = harness().await;

    h.send_line("/frobnicate").await;

    let entry = h
        .expect(|event| match event {
            DisplayEvent::Log(entry) => Some(entry),
            _ => None,
        })
        .await;
    assert_eq!(entry.category, LogCategory::BadCommand);
    assert!(entry.message.contains("/frobnicate"));
}

#[tokio::test(start_paused = true)]
async fn missing_argument_produces_badcmd_log() {
    let mut h = harness().await;

    h.send_line("/r").await;

    let entry = h
        .expect(|event| match event {
            DisplayEvent::Log(entry) => Some(entry),
            _ => None,
        })
        .await;
    assert_eq!(entry.category, LogCategory::BadCommand);
    assert!(entry.message.contains("room name"));
}

#[tokio::test(start_paused = true)]
async fn username_command_renames_future_messages() {
    let mut h = harness().await;

    h.send_line("/u neo").await;
    let username = h
        .expect(|event| match event {
            DisplayEvent::UsernameChanged { username } => Some(username),
            _ => None,
        })
        .await;
    assert_eq!(username, "neo");

    h.send_line("who am i").await;
    let received = h.next_text_at_bob().await;
    assert_eq!(received.sender_name, "neo");
}

#[tokio::test(start_paused = true)]
async fn switch_command_announces_and_activates_the_new_room() {
    let mut h = harness().await;

    h.send_line("/r den").await;

    let entry = h
        .expect(|event| match event {
            DisplayEvent::Log(entry) => Some(entry),
            _ => None,
        })
        .await;
    assert_eq!(entry.category, LogCategory::RoomChange);
    assert!(entry.message.contains("den"));

    let room_name = h
        .expect(|event| match event {
            DisplayEvent::RoomChanged { room_name } => Some(room_name),
            _ => None,
        })
        .await;
    assert_eq!(room_name, "den");
}

#[tokio::test(start_paused = true)]
async fn peer_refresh_reports_the_room_peers() {
    let mut h = harness().await;

    let peers = h
        .expect(|event| match event {
            DisplayEvent::Peers(peers) => Some(peers),
            _ => None,
        })
        .await;
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].as_str(), "peer-bob");
}

#[tokio::test(start_paused = true)]
async fn quit_command_stops_the_dispatcher() {
    let mut h = harness().await;

    h.send_line("/quit").await;

    h.expect(|event| match event {
        DisplayEvent::Quit => Some(()),
        _ => None,
    })
    .await;

    // The dispatcher has left the room; bob sees alice disappear.
    let deadline = tokio::time::Instant::now() + WAIT;
    while !h.bob.peers().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "alice never left");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
