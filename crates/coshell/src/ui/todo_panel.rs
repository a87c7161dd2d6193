//! Todo list panel widget.

use crate::app::App;
use crate::ui::theme::title_style;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders the numbered todo list into `area`.
pub fn render_todo_panel(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" ToDo ({}) ", app.todos.len()),
            title_style(),
        ));

    let lines: Vec<Line> = if app.todos.is_empty() {
        vec![Line::from(Span::styled(
            "No tasks yet. Press a to add one.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.todos
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Line::from(vec![
                    Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::raw(item.as_str()),
                ])
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
