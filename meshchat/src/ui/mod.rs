//! Terminal UI rendering.
//!
//! Layout mirrors the classic three-box chat TUI: the shared message/log
//! view with a peer sidebar on the right, and the input field underneath.
//! All state lives in [`App`]; rendering is pure.

pub mod chat_panel;
pub mod peer_panel;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(22)])
        .split(rows[0]);

    chat_panel::render(frame, columns[0], app);
    peer_panel::render(frame, columns[1], app);
    render_input(frame, rows[1], app);
}

/// Render the input field with the username as its label.
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let mut text = app.input.clone();
    if app.cursor_position >= text.len() {
        text.push('█');
    } else {
        text.insert(app.cursor_position, '█');
    }

    let line = Line::from(vec![
        Span::styled(
            format!("{} > ", app.username),
            Style::default().fg(Color::Blue),
        ),
        Span::raw(text),
    ]);

    let input = Paragraph::new(line).block(
        Block::default()
            .title("Input")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(input, area);
}
