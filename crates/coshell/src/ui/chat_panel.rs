//! Chat panel widget.
//!
//! Shows the chat log scrolled to its newest line, or a rendered QR code
//! when one is being displayed.

use crate::app::{App, ChatState, QrView};
use crate::ui::theme::{chat_line_style, title_style};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders the chat panel into `area`.
pub fn render_chat_panel(frame: &mut Frame, area: Rect, app: &App) {
    match &app.qr {
        Some(qr) => render_qr(frame, area, qr),
        None => render_chat_log(frame, area, app),
    }
}

fn render_chat_log(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(" Chat ", title_style()));

    let log = app.chat_log.lines();
    let visible = usize::from(area.height.saturating_sub(2));

    let lines: Vec<Line> = if log.is_empty() {
        vec![Line::from(Span::styled(
            empty_hint(&app.chat),
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let skip = log.len().saturating_sub(visible);
        log.iter()
            .skip(skip)
            .map(|line| Line::from(Span::styled(line.text.clone(), chat_line_style(line.kind))))
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn empty_hint(state: &ChatState) -> &'static str {
    match state {
        ChatState::Offline => "Not connected. Press c to connect.",
        ChatState::Connecting { .. } => "Connecting...",
        ChatState::Connected { .. } => "Connected. Press m to send a message.",
        ChatState::Closed { .. } => "Connection closed.",
    }
}

fn render_qr(frame: &mut Frame, area: Rect, qr: &QrView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!(" QR: {} ", qr.path), title_style()));

    let lines: Vec<Line> = qr.lines.iter().map(|l| Line::raw(l.as_str())).collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
