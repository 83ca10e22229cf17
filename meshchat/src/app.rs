//! Application state for the TUI.
//!
//! [`App`] holds everything the renderer needs: the shared message/log
//! view, the peer list, the input line, and the room/username labels.
//! It is mutated from two directions — key events from crossterm and
//! [`DisplayEvent`]s from the dispatcher — and read by `ui::draw`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::chat::LogCategory;
use crate::dispatcher::DisplayEvent;

/// What kind of line is shown in the shared view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A message from a peer.
    Peer,
    /// The local echo of the user's own message.
    SelfEcho,
    /// A tagged log line.
    Log(LogCategory),
}

/// One rendered line of the shared message/log view.
#[derive(Debug, Clone)]
pub struct DisplayLine {
    /// Controls the label color.
    pub kind: LineKind,
    /// The `<label>:` prefix (sender name or log category).
    pub label: String,
    /// The line body.
    pub text: String,
    /// Formatted receive time (e.g. "14:23").
    pub timestamp: String,
}

/// Main application state.
pub struct App {
    /// Current text input.
    pub input: String,
    /// Cursor position in input (byte index, kept on char boundaries).
    pub cursor_position: usize,
    /// Lines of the shared message/log view.
    pub lines: Vec<DisplayLine>,
    /// Scroll offset into `lines`.
    pub scroll: usize,
    /// Shortened peer IDs for the sidebar.
    pub peers: Vec<String>,
    /// Name of the active room.
    pub room_name: String,
    /// Local display name.
    pub username: String,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates application state with an empty view.
    #[must_use]
    pub fn new(room_name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            cursor_position: 0,
            lines: Vec::new(),
            scroll: 0,
            peers: Vec::new(),
            room_name: room_name.into(),
            username: username.into(),
            should_quit: false,
        }
    }

    /// Applies one dispatcher event to the view state.
    pub fn apply(&mut self, event: DisplayEvent) {
        match event {
            DisplayEvent::PeerMessage { sender_name, text } => {
                self.push_line(LineKind::Peer, sender_name, text);
            }
            DisplayEvent::SelfMessage { sender_name, text } => {
                self.push_line(LineKind::SelfEcho, sender_name, text);
            }
            DisplayEvent::Log(entry) => {
                self.push_line(
                    LineKind::Log(entry.category),
                    entry.category.to_string(),
                    entry.message,
                );
            }
            DisplayEvent::Peers(peers) => {
                self.peers = peers.iter().map(|p| p.short().to_string()).collect();
            }
            DisplayEvent::RoomChanged { room_name } => {
                // Fresh room, fresh view.
                self.room_name = room_name;
                self.lines.clear();
                self.scroll = 0;
            }
            DisplayEvent::UsernameChanged { username } => {
                self.username = username;
            }
            DisplayEvent::Quit => {
                self.should_quit = true;
            }
        }
    }

    fn push_line(&mut self, kind: LineKind, label: String, text: String) {
        self.lines.push(DisplayLine {
            kind,
            label,
            text,
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        });
        // Keep the view pinned to the newest line.
        self.scroll = self.lines.len().saturating_sub(1);
    }

    /// Handles a key event. Returns the submitted line on Enter.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<String> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => {
                self.should_quit = true;
                None
            }
            (KeyCode::Enter, _) => self.submit_line(),
            (KeyCode::Char(c), _) => {
                self.enter_char(c);
                None
            }
            (KeyCode::Backspace, _) => {
                self.delete_char();
                None
            }
            (KeyCode::Left, _) => {
                self.move_cursor_left();
                None
            }
            (KeyCode::Right, _) => {
                self.move_cursor_right();
                None
            }
            (KeyCode::Home, _) => {
                self.cursor_position = 0;
                None
            }
            (KeyCode::End, _) => {
                self.cursor_position = self.input.len();
                None
            }
            (KeyCode::Up, _) => {
                self.scroll = self.scroll.saturating_sub(1);
                None
            }
            (KeyCode::Down, _) => {
                if self.scroll < self.lines.len().saturating_sub(1) {
                    self.scroll += 1;
                }
                None
            }
            _ => None,
        }
    }

    /// Takes the current input as a submitted line, if non-empty.
    fn submit_line(&mut self) -> Option<String> {
        if self.input.trim().is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        Some(line)
    }

    fn enter_char(&mut self, c: char) {
        self.input.insert(self.cursor_position, c);
        self.cursor_position += c.len_utf8();
    }

    fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        let prev = previous_char_boundary(&self.input, self.cursor_position);
        self.input.remove(prev);
        self.cursor_position = prev;
    }

    fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position = previous_char_boundary(&self.input, self.cursor_position);
        }
    }

    fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.len() {
            let next = self.input[self.cursor_position..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.cursor_position += next;
        }
    }
}

/// Byte index of the char boundary before `index`.
fn previous_char_boundary(s: &str, index: usize) -> usize {
    s[..index].char_indices().last().map_or(0, |(i, _)| i)
}
