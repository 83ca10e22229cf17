//! Event dispatcher wiring the TUI to the room layer.
//!
//! This module bridges the synchronous TUI event loop (crossterm
//! poll-based) with the async room stack. It spawns one background task
//! that owns the [`RoomSwitcher`] and communicates with the main thread
//! via [`UserInput`] / [`DisplayEvent`] channels.
//!
//! # Architecture
//!
//! ```text
//! TUI (main thread)  ←── DisplayEvent ───  dispatcher task ── ChatRoom loops
//!                     ─── UserInput ──→
//! ```
//!
//! The dispatcher is the single consumer of the active room's queues. Each
//! iteration it snapshots the active room once, then waits on user input,
//! the room's multiplexed event queue, or the peer refresh tick. Command
//! parsing happens here, at the boundary, into a tagged [`Command`] value
//! that is matched exhaustively.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use meshchat_proto::assembler::CompletedFile;

use crate::chat::switcher::RoomSwitcher;
use crate::chat::{ChatRoom, LogCategory, LogEntry, RoomConfig, RoomEvent};
use crate::mesh::{JoinError, MeshNode, PeerId};

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/quit` — stop the application.
    Quit,
    /// `/r <room>` — switch to another room.
    SwitchRoom(String),
    /// `/u <name>` — change the local display name.
    UpdateUsername(String),
    /// `/send <path>` — send a file to the room.
    SendFile(PathBuf),
}

/// Error produced when a command line cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command requires an argument that was not supplied.
    #[error("missing {0} for command")]
    MissingArgument(&'static str),

    /// The first token is not a recognized command.
    #[error("unsupported command - {0}")]
    Unknown(String),
}

/// A parsed line of user input: either a chat message or a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain chat text to publish to the room.
    Message(String),
    /// A recognized slash command.
    Command(Command),
}

impl Input {
    /// Parses one line of user input.
    ///
    /// Lines starting with `/` are commands: the first space-delimited
    /// token selects the command (case-sensitive) and the remainder of
    /// the line is its argument. Everything else is a chat message.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for unknown commands and for commands
    /// missing their required argument.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        if !line.starts_with('/') {
            return Ok(Self::Message(line.to_string()));
        }

        let (command, arg) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" => Ok(Self::Command(Command::Quit)),
            "/r" => {
                if arg.is_empty() {
                    Err(CommandError::MissingArgument("room name"))
                } else {
                    Ok(Self::Command(Command::SwitchRoom(arg.to_string())))
                }
            }
            "/u" => {
                if arg.is_empty() {
                    Err(CommandError::MissingArgument("user name"))
                } else {
                    Ok(Self::Command(Command::UpdateUsername(arg.to_string())))
                }
            }
            "/send" => {
                if arg.is_empty() {
                    Err(CommandError::MissingArgument("file name"))
                } else {
                    Ok(Self::Command(Command::SendFile(PathBuf::from(arg))))
                }
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Input sent from the TUI main loop to the dispatcher task.
#[derive(Debug)]
pub enum UserInput {
    /// One submitted line (message or command, parsed by the dispatcher).
    Line(String),
    /// Stop the dispatcher without going through `/quit`.
    Shutdown,
}

/// Events sent from the dispatcher task to the TUI main loop.
#[derive(Debug)]
pub enum DisplayEvent {
    /// A chat message from a peer.
    PeerMessage {
        /// The sender's display name.
        sender_name: String,
        /// The message body.
        text: String,
    },
    /// The local echo of a message the user just submitted.
    SelfMessage {
        /// The local display name at submit time.
        sender_name: String,
        /// The message body.
        text: String,
    },
    /// A tagged log line for the shared view.
    Log(LogEntry),
    /// Fresh snapshot of the room's peer list.
    Peers(Vec<PeerId>),
    /// The active room changed (initial join or `/r`).
    RoomChanged {
        /// Name of the now-active room.
        room_name: String,
    },
    /// The local display name changed (initial join or `/u`).
    UsernameChanged {
        /// The new display name.
        username: String,
    },
    /// The dispatcher has stopped; the TUI should exit.
    Quit,
}

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Interval between peer list refreshes.
    pub peer_refresh: Duration,
    /// Wait between activating a new room and leaving the old one.
    pub settle_delay: Duration,
    /// Directory where completed file transfers are written.
    pub download_dir: PathBuf,
    /// Capacity of the input/display channels.
    pub channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            peer_refresh: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            download_dir: std::env::temp_dir(),
            channel_capacity: 64,
        }
    }
}

/// Joins the initial room and spawns the dispatcher task.
///
/// Returns the input sender and display receiver for the TUI main loop.
/// The initial [`DisplayEvent::RoomChanged`] and
/// [`DisplayEvent::UsernameChanged`] are emitted before the task starts so
/// the TUI sees the resolved defaults (`guest` / `lobby`).
///
/// # Errors
///
/// Returns [`JoinError`] if the initial room cannot be joined; nothing is
/// spawned in that case.
pub async fn spawn_dispatcher<N: MeshNode>(
    node: Arc<N>,
    username: &str,
    room: &str,
    room_config: RoomConfig,
    config: DispatcherConfig,
) -> Result<(mpsc::Sender<UserInput>, mpsc::Receiver<DisplayEvent>), JoinError> {
    let initial =
        ChatRoom::join_with_config(node.as_ref(), username, room, room_config.clone()).await?;

    if let Err(error) = tokio::fs::create_dir_all(&config.download_dir).await {
        tracing::warn!(
            dir = %config.download_dir.display(),
            error = %error,
            "could not create download directory"
        );
    }

    let (input_tx, input_rx) = mpsc::channel(config.channel_capacity);
    let (display_tx, display_rx) = mpsc::channel(config.channel_capacity);

    let _ = display_tx
        .send(DisplayEvent::RoomChanged {
            room_name: initial.room_name().to_string(),
        })
        .await;
    let _ = display_tx
        .send(DisplayEvent::UsernameChanged {
            username: initial.username(),
        })
        .await;

    let switcher =
        RoomSwitcher::new(node, initial, room_config).with_settle_delay(config.settle_delay);
    tokio::spawn(run_dispatcher(switcher, input_rx, display_tx, config));

    Ok((input_tx, display_rx))
}

/// One iteration's worth of wakeup, gathered by the select below.
enum Dispatch {
    Input(Option<UserInput>),
    Room(RoomEvent),
    PeerTick,
}

/// The dispatcher select loop.
///
/// Exits on `/quit`, on [`UserInput::Shutdown`], when the TUI drops the
/// input channel, or when the active room's queues close unexpectedly.
/// Always leaves the active room before returning.
pub async fn run_dispatcher<N: MeshNode>(
    mut switcher: RoomSwitcher<N>,
    mut input_rx: mpsc::Receiver<UserInput>,
    display_tx: mpsc::Sender<DisplayEvent>,
    config: DispatcherConfig,
) {
    let mut refresh = time::interval(config.peer_refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let wakeup = {
            // Snapshot the active room once per iteration; a concurrent
            // switch replaces it only between iterations.
            let room = switcher.current_mut();
            tokio::select! {
                maybe = input_rx.recv() => Dispatch::Input(maybe),
                event = room.next_event() => Dispatch::Room(event),
                _ = refresh.tick() => Dispatch::PeerTick,
            }
        };

        match wakeup {
            Dispatch::Input(None | Some(UserInput::Shutdown)) => break,
            Dispatch::Input(Some(UserInput::Line(line))) => {
                if !handle_line(&mut switcher, &display_tx, &line).await {
                    break;
                }
            }
            Dispatch::Room(RoomEvent::Message(message)) => {
                let _ = display_tx
                    .send(DisplayEvent::PeerMessage {
                        sender_name: message.sender_name,
                        text: message.text,
                    })
                    .await;
            }
            Dispatch::Room(RoomEvent::Log(entry)) => {
                let _ = display_tx.send(DisplayEvent::Log(entry)).await;
            }
            Dispatch::Room(RoomEvent::FileReceived(file)) => {
                save_completed_file(&display_tx, &config, file).await;
            }
            Dispatch::Room(RoomEvent::Closed) => {
                let _ = display_tx
                    .send(DisplayEvent::Log(LogEntry::error(
                        "active room closed unexpectedly",
                    )))
                    .await;
                break;
            }
            Dispatch::PeerTick => {
                let _ = display_tx
                    .send(DisplayEvent::Peers(switcher.current().peers()))
                    .await;
            }
        }
    }

    let _ = display_tx.send(DisplayEvent::Quit).await;
    switcher.shutdown().await;
    tracing::info!("dispatcher stopped");
}

/// Handles one submitted line. Returns `false` when the app should quit.
async fn handle_line<N: MeshNode>(
    switcher: &mut RoomSwitcher<N>,
    display_tx: &mpsc::Sender<DisplayEvent>,
    line: &str,
) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }

    match Input::parse(line) {
        Ok(Input::Message(text)) => {
            // Echo locally right away; the inbound loop drops the
            // fabric's copy of our own publish.
            let _ = display_tx
                .send(DisplayEvent::SelfMessage {
                    sender_name: switcher.current().username(),
                    text: text.clone(),
                })
                .await;
            if switcher.current().send_text(text).await.is_err() {
                let _ = display_tx
                    .send(DisplayEvent::Log(LogEntry::error(
                        "message not sent: room is closed",
                    )))
                    .await;
            }
            true
        }
        Ok(Input::Command(command)) => handle_command(switcher, display_tx, command).await,
        Err(error) => {
            let _ = display_tx
                .send(DisplayEvent::Log(LogEntry::new(
                    LogCategory::BadCommand,
                    error.to_string(),
                )))
                .await;
            true
        }
    }
}

/// Executes one parsed command. Returns `false` when the app should quit.
async fn handle_command<N: MeshNode>(
    switcher: &mut RoomSwitcher<N>,
    display_tx: &mpsc::Sender<DisplayEvent>,
    command: Command,
) -> bool {
    match command {
        Command::Quit => false,
        Command::SwitchRoom(name) => {
            let _ = display_tx
                .send(DisplayEvent::Log(LogEntry::new(
                    LogCategory::RoomChange,
                    format!("joining new room '{name}'"),
                )))
                .await;
            match switcher.switch_room(&name).await {
                Ok(()) => {
                    let _ = display_tx
                        .send(DisplayEvent::RoomChanged {
                            room_name: switcher.current().room_name().to_string(),
                        })
                        .await;
                }
                Err(error) => {
                    let _ = display_tx
                        .send(DisplayEvent::Log(LogEntry::new(
                            LogCategory::JumpError,
                            format!("could not change chat room - {error}"),
                        )))
                        .await;
                }
            }
            true
        }
        Command::UpdateUsername(name) => {
            switcher.current().update_username(&name);
            let _ = display_tx
                .send(DisplayEvent::UsernameChanged {
                    username: switcher.current().username(),
                })
                .await;
            true
        }
        Command::SendFile(path) => {
            match switcher.current().send_file(&path).await {
                Ok(()) => {
                    let _ = display_tx
                        .send(DisplayEvent::Log(LogEntry::info("file sent successfully")))
                        .await;
                }
                Err(error) => {
                    let _ = display_tx
                        .send(DisplayEvent::Log(LogEntry::error(format!(
                            "failed to send file: {error}"
                        ))))
                        .await;
                }
            }
            true
        }
    }
}

/// Writes a completed transfer into the download directory.
///
/// The file name is reduced to its final component so a peer cannot steer
/// the write outside the download directory.
async fn save_completed_file(
    display_tx: &mpsc::Sender<DisplayEvent>,
    config: &DispatcherConfig,
    file: CompletedFile,
) {
    let name = Path::new(&file.file_name)
        .file_name()
        .map_or_else(|| OsString::from("received.bin"), ToOwned::to_owned);
    let path = config.download_dir.join(name);

    match tokio::fs::write(&path, &file.bytes).await {
        Ok(()) => {
            let _ = display_tx
                .send(DisplayEvent::Log(LogEntry::info(format!(
                    "received file {} from {} ({} bytes) -> {}",
                    file.file_name,
                    file.sender_name,
                    file.bytes.len(),
                    path.display()
                ))))
                .await;
        }
        Err(error) => {
            tracing::warn!(file = %file.file_name, error = %error, "failed to save received file");
            let _ = display_tx
                .send(DisplayEvent::Log(LogEntry::error(format!(
                    "failed to save received file {}: {error}",
                    file.file_name
                ))))
                .await;
        }
    }
}
