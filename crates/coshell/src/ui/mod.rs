//! UI rendering module for the coshell UI.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: Title and Chat Status                   |  <- 3 lines
//! +------------------------+-------------------------+
//! | Chat (or QR code)      |  ToDo                   |  <- fills remaining
//! | (50%)                  |  (50%)                  |
//! |  hello from bob        |  1. review PR           |
//! |  hi bob                |  2. buy milk            |
//! +------------------------+-------------------------+
//! |  Input bar: Prompt / Keys, titled with status    |  <- 3 lines
//! +--------------------------------------------------+
//! ```

pub mod chat_panel;
pub mod layout;
pub mod status_bar;
pub mod theme;
pub mod todo_panel;

use crate::app::App;
use layout::AppLayout;
use ratatui::Frame;

pub use chat_panel::render_chat_panel;
pub use status_bar::{render_header, render_input_bar};
pub use todo_panel::render_todo_panel;

/// Renders the complete UI.
///
/// # Example
///
/// ```ignore
/// terminal.draw(|frame| {
///     ui::render(frame, &app);
/// })?;
/// ```
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_chat_panel(frame, layout.chat_area, app);
    render_todo_panel(frame, layout.todo_area, app);
    render_input_bar(frame, layout.input_bar, app);
}
