//! Header and input bar widgets for the coshell UI.
//!
//! - Header: Application title and chat connection status
//! - Input bar: Current prompt and typed text, titled with the latest
//!   status message

use crate::app::{App, ChatState, InputMode};
use crate::ui::theme::{chat_state_color, key_style};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders the header bar with title and chat connection status.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let color = chat_state_color(&app.chat);
    let status = match &app.chat {
        ChatState::Offline => "chat offline".to_string(),
        ChatState::Connecting { target } => format!("connecting to {target}"),
        ChatState::Connected { target } => format!("connected to {target}"),
        ChatState::Closed { target } => format!("disconnected from {target}"),
    };

    let header_line = Line::from(vec![
        Span::styled(
            "CoShell",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - ToDo + Chat | "),
        Span::styled(status, Style::default().fg(color)),
    ]);

    let header = Paragraph::new(header_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
    );

    frame.render_widget(header, area);
}

/// Renders the input bar.
///
/// In command mode the bar lists the command keys; in prompt modes it shows
/// the prompt, the typed text and a cursor.
pub fn render_input_bar(frame: &mut Frame, area: Rect, app: &App) {
    let line = match app.mode {
        InputMode::Command => command_hints(),
        _ => Line::from(vec![
            Span::styled(app.mode.prompt(), Style::default().fg(Color::Yellow)),
            Span::raw(app.input.as_str()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
    };

    let mut block = Block::default().borders(Borders::ALL);
    if let Some(status) = &app.status {
        let color = if status.is_error { Color::Red } else { Color::Green };
        block = block.title(Span::styled(
            format!(" {} ", status.text),
            Style::default().fg(color),
        ));
    }

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn command_hints() -> Line<'static> {
    let hints = [("a", "add todo"), ("q", "QR"), ("c", "connect"), ("m", "message"), ("x", "exit")];

    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {key}"), key_style()));
        spans.push(Span::raw(format!(" {label} ")));
    }
    Line::from(spans)
}
