//! Keyboard input handling for the coshell UI.
//!
//! This module provides event types and handlers for keyboard input,
//! terminal resizing, and chat connection events.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use crate::app::{App, InputMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Host used when the host prompt is submitted empty.
pub const DEFAULT_CHAT_HOST: &str = "localhost";

// ============================================================================
// Event Types
// ============================================================================

/// Events that drive the UI event loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input from the user.
    Key(KeyEvent),

    /// Terminal window resize event.
    Resize(u16, u16),

    /// Chat session established.
    ChatConnected { target: String },

    /// Bytes written by the chat session for display.
    ChatData(Vec<u8>),

    /// The chat session's output ended.
    ChatClosed,

    /// Connecting to the chat server failed.
    ChatFailed(String),
}

// ============================================================================
// Action Types
// ============================================================================

/// Actions the main loop performs in response to input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action required.
    None,

    /// Quit the application.
    Quit,

    /// Append an item to the todo list.
    AddTodo(String),

    /// Render a file path as a QR code.
    RenderQr(String),

    /// Connect the chat pane to a server.
    ConnectChat { host: String, port: u16 },

    /// Send one line over the chat connection.
    SendChat(String),
}

// ============================================================================
// Input Handler
// ============================================================================

/// Handles a keyboard event and updates application state accordingly.
///
/// # Key Bindings
///
/// In command mode:
///
/// | Key                | Action                            |
/// |--------------------|-----------------------------------|
/// | `a`                | Prompt for a todo item            |
/// | `q`                | Prompt for a file path to QR      |
/// | `c`                | Prompt for chat host, then port   |
/// | `m`                | Prompt for a chat message         |
/// | `x`, `Esc`         | Quit                              |
/// | `Ctrl+C`           | Quit (in every mode)              |
///
/// In prompt modes, characters are typed into the input, `Backspace`
/// deletes, `Enter` submits and `Esc` cancels.
#[must_use]
pub fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Action::Quit;
    }

    if app.mode.is_text_entry() {
        handle_prompt_key(key, app)
    } else {
        handle_command_key(key, app)
    }
}

fn handle_command_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Char('x') | KeyCode::Char('X') | KeyCode::Esc => {
            app.quit();
            Action::Quit
        }

        KeyCode::Char('a') | KeyCode::Char('A') => {
            app.enter_mode(InputMode::AddTodo);
            Action::None
        }

        KeyCode::Char('q') | KeyCode::Char('Q') => {
            app.enter_mode(InputMode::QrPath);
            Action::None
        }

        KeyCode::Char('c') | KeyCode::Char('C') => {
            if app.chat.is_busy() {
                app.set_error("Already connected; restart to change servers");
            } else {
                app.enter_mode(InputMode::ChatHost);
            }
            Action::None
        }

        KeyCode::Char('m') | KeyCode::Char('M') => {
            if app.chat.is_connected() {
                app.enter_mode(InputMode::ChatMessage);
            } else {
                app.set_error("Not connected; press c to connect");
            }
            Action::None
        }

        _ => Action::None,
    }
}

fn handle_prompt_key(key: KeyEvent, app: &mut App) -> Action {
    match key.code {
        KeyCode::Esc => {
            app.reset_mode();
            Action::None
        }

        KeyCode::Backspace => {
            app.input.pop();
            Action::None
        }

        KeyCode::Enter => submit_prompt(app),

        KeyCode::Char(c) => {
            app.input.push(c);
            Action::None
        }

        _ => Action::None,
    }
}

/// Completes the current prompt and returns the resulting action.
fn submit_prompt(app: &mut App) -> Action {
    let text = app.take_input();

    match app.mode.clone() {
        InputMode::Command => Action::None,

        InputMode::AddTodo => {
            app.reset_mode();
            Action::AddTodo(text)
        }

        InputMode::QrPath => {
            app.reset_mode();
            Action::RenderQr(text)
        }

        InputMode::ChatHost => {
            let host = match text.trim() {
                "" => DEFAULT_CHAT_HOST.to_string(),
                host => host.to_string(),
            };
            app.enter_mode(InputMode::ChatPort { host });
            Action::None
        }

        InputMode::ChatPort { host } => {
            app.reset_mode();
            match text.trim().parse::<u16>() {
                Ok(port) if port != 0 => Action::ConnectChat { host, port },
                _ => {
                    app.set_error(format!("Invalid port: {:?}", text.trim()));
                    Action::None
                }
            }
        }

        // Stays in message mode so consecutive lines can be sent.
        InputMode::ChatMessage => {
            if text.is_empty() {
                Action::None
            } else {
                Action::SendChat(text)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
