//! Layout helpers for the coshell UI.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main application layout areas.
///
/// The UI is divided into three vertical sections:
/// - Header (3 lines): Title and chat connection status
/// - Content (fills remaining): Split into chat (50%) and todo (50%)
/// - Input bar (3 lines): Prompt, typed text and status messages
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    /// Left panel for the chat log or a rendered QR code
    pub chat_area: Rect,
    /// Right panel for the todo list
    pub todo_area: Rect,
    pub input_bar: Rect,
}

impl AppLayout {
    /// Creates a new AppLayout by splitting the given area.
    pub fn new(area: Rect) -> Self {
        let [header, content, input_bar] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // Content
                Constraint::Length(3), // Input bar
            ])
            .areas(area);

        let [chat_area, todo_area] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(content);

        Self {
            header,
            chat_area,
            todo_area,
            input_bar,
        }
    }
}
