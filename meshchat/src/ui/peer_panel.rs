//! Peer list sidebar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::App;

/// Render the sidebar with the room's current peers.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .peers
        .iter()
        .map(|peer| ListItem::new(peer.as_str()))
        .collect();

    let block = Block::default()
        .title("Peers")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(List::new(items).block(block), area);
}
