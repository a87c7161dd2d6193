//! Shared theme utilities for the coshell UI.
//!
//! Provides consistent styling across all UI components.

use crate::app::{ChatState, LineKind};
use ratatui::style::{Color, Modifier, Style};

/// Color of the header border and status text for a chat state.
pub fn chat_state_color(state: &ChatState) -> Color {
    match state {
        ChatState::Offline => Color::DarkGray,
        ChatState::Connecting { .. } => Color::Yellow,
        ChatState::Connected { .. } => Color::Green,
        ChatState::Closed { .. } => Color::Red,
    }
}

/// Style for one chat log line.
///
/// Lines sent by this user are dimmed; received lines use the default
/// foreground.
pub fn chat_line_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Remote => Style::default(),
        LineKind::Local => Style::default().fg(Color::Cyan),
    }
}

/// Style for keybinding hints.
pub fn key_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

/// Style for panel titles.
pub fn title_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_state_colors() {
        assert_eq!(chat_state_color(&ChatState::Offline), Color::DarkGray);
        assert_eq!(
            chat_state_color(&ChatState::Connected { target: "a".into() }),
            Color::Green
        );
        assert_eq!(
            chat_state_color(&ChatState::Closed { target: "a".into() }),
            Color::Red
        );
    }

    #[test]
    fn test_local_lines_are_distinct() {
        assert_ne!(chat_line_style(LineKind::Local), chat_line_style(LineKind::Remote));
    }
}
