//! coshell TUI - Library modules
//!
//! This library provides the terminal front end of coshell: the split-pane
//! todo + chat UI and the interactive main menu.
//!
//! # Architecture
//!
//! The UI uses an event-driven architecture with three main components:
//!
//! 1. **Keyboard Task**: Polls for keyboard input and sends events to the main loop
//! 2. **Chat Bridge**: Runs a chat session and forwards its output as events
//! 3. **Main Event Loop**: Processes events, updates state, and renders the UI
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.

pub mod app;
pub mod chat;
pub mod error;
pub mod input;
pub mod menu;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use chat::{spawn_chat, ChatLink};
pub use error::{Result, TuiError};
pub use menu::{run_menu, MenuChoice};
