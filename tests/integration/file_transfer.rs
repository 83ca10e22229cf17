//! End-to-end file transfer tests over the in-process mesh.
//!
//! Covers the documented example (10000 bytes, 4096-byte chunks, three
//! chunks of 4096/4096/1808), ceiling enforcement before any chunk is
//! published, and failure modes of `send_file`.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::timeout;

use meshchat::chat::{ChatRoom, FileError, RoomEvent};
use meshchat::mesh::local::{LocalMesh, LocalTopic};
use meshchat_proto::assembler::CompletedFile;

const WAIT: Duration = Duration::from_secs(5);

/// Writes a unique temp file with the given contents, returning its path.
fn temp_file(tag: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("meshchat-it-{}-{tag}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Waits for a completed file, skipping text and log events.
async fn next_file(room: &mut ChatRoom<LocalTopic>) -> CompletedFile {
    loop {
        let event = timeout(WAIT, room.next_event())
            .await
            .expect("timed out waiting for a completed file");
        match event {
            RoomEvent::FileReceived(file) => return file,
            RoomEvent::Log(_) | RoomEvent::Message(_) => {}
            RoomEvent::Closed => panic!("room closed while waiting for a file"),
        }
    }
}

#[tokio::test]
async fn ten_kilobyte_file_arrives_byte_identical() {
    let mesh = LocalMesh::new();
    let alice_node = mesh.node("peer-alice");
    let bob_node = mesh.node("peer-bob");

    let mut alice = ChatRoom::join(&alice_node, "alice", "files").await.unwrap();
    let mut bob = ChatRoom::join(&bob_node, "bob", "files").await.unwrap();

    let contents: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let path = temp_file("10k.bin", &contents);

    alice.send_file(&path).await.unwrap();

    let file = next_file(&mut bob).await;
    assert_eq!(file.bytes.len(), 10_000);
    assert_eq!(file.bytes, contents);
    assert_eq!(file.sender_id, "peer-alice");
    assert!(file.file_name.ends_with("10k.bin"));

    std::fs::remove_file(&path).ok();
    alice.leave().await;
    bob.leave().await;
}

#[tokio::test]
async fn exact_chunk_multiple_completes() {
    let mesh = LocalMesh::new();
    let alice_node = mesh.node("peer-alice");
    let bob_node = mesh.node("peer-bob");

    let mut alice = ChatRoom::join(&alice_node, "alice", "files").await.unwrap();
    let mut bob = ChatRoom::join(&bob_node, "bob", "files").await.unwrap();

    // 8192 bytes = exactly two 4096-byte chunks; the transfer must
    // terminate without waiting for a phantom third chunk.
    let contents = vec![0x5a; 8192];
    let path = temp_file("even.bin", &contents);

    alice.send_file(&path).await.unwrap();

    let file = next_file(&mut bob).await;
    assert_eq!(file.bytes, contents);

    std::fs::remove_file(&path).ok();
    alice.leave().await;
    bob.leave().await;
}

#[tokio::test]
async fn oversized_file_is_rejected_before_any_chunk_is_published() {
    let mesh = LocalMesh::new();
    let alice_node = mesh.node("peer-alice");
    let bob_node = mesh.node("peer-bob");

    let mut alice = ChatRoom::join(&alice_node, "alice", "files").await.unwrap();
    let mut bob = ChatRoom::join(&bob_node, "bob", "files").await.unwrap();

    let contents = vec![1u8; 150 * 1024];
    let path = temp_file("big.bin", &contents);

    let result = alice.send_file(&path).await;
    assert!(matches!(
        result,
        Err(FileError::TooLarge {
            size,
            max: 102_400,
        }) if size == 150 * 1024
    ));

    // No partial transfer: bob must see nothing at all.
    let event = timeout(Duration::from_millis(300), bob.next_event()).await;
    assert!(event.is_err(), "unexpected event after rejected send: {event:?}");

    std::fs::remove_file(&path).ok();
    alice.leave().await;
    bob.leave().await;
}

#[tokio::test]
async fn missing_file_is_a_read_error() {
    let mesh = LocalMesh::new();
    let node = mesh.node("peer-alice");
    let mut alice = ChatRoom::join(&node, "alice", "files").await.unwrap();

    let result = alice.send_file("/definitely/not/here.bin").await;
    assert!(matches!(result, Err(FileError::Read { .. })));

    alice.leave().await;
}

#[tokio::test]
async fn send_file_after_leave_fails_on_publish() {
    let mesh = LocalMesh::new();
    let node = mesh.node("peer-alice");
    let mut alice = ChatRoom::join(&node, "alice", "files").await.unwrap();

    let path = temp_file("late.bin", b"some bytes");
    alice.leave().await;

    let result = alice.send_file(&path).await;
    assert!(matches!(result, Err(FileError::Publish(_))));

    std::fs::remove_file(&path).ok();
}
