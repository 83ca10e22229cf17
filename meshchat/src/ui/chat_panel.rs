//! Shared message/log view rendering.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::{App, LineKind};

/// Render the shared message/log view.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let height = area.height.saturating_sub(2) as usize;
    let first = app
        .scroll
        .saturating_sub(height.saturating_sub(1))
        .min(app.lines.len());

    let items: Vec<ListItem> = app.lines[first..]
        .iter()
        .map(|line| {
            let label_color = match line.kind {
                LineKind::Peer => Color::Green,
                LineKind::SelfEcho => Color::Blue,
                LineKind::Log(_) => Color::Yellow,
            };
            let row = Line::from(vec![
                Span::styled(&line.timestamp, Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    format!("<{}>:", line.label),
                    Style::default().fg(label_color),
                ),
                Span::raw(" "),
                Span::raw(&line.text),
            ]);
            ListItem::new(row)
        })
        .collect();

    let block = Block::default()
        .title(format!("ChatRoom-{}", app.room_name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(List::new(items).block(block), area);
}
