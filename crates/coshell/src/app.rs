//! Application state for the coshell terminal UI.
//!
//! Holds the chat log, the displayed todo list, the prompt the user is
//! typing into, and the chat connection state.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use chrono::{DateTime, Utc};
use coshell_core::{QrRenderer, TodoList};
use tracing::{debug, warn};

/// Chat log lines kept in memory.
pub const MAX_CHAT_LINES: usize = 500;

/// Bytes held without a newline before they are shown as a line of their own.
pub const MAX_PARTIAL_LINE: usize = coshell_chat::server::READ_BUFFER_SIZE;

// ============================================================================
// Chat State
// ============================================================================

/// State of the chat connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    /// No connection has been made yet.
    Offline,

    /// Connection in progress.
    Connecting { target: String },

    /// Connected to a chat server.
    Connected { target: String },

    /// The connection ended.
    Closed { target: String },
}

impl ChatState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting { .. } | Self::Connected { .. })
    }
}

// ============================================================================
// Input Mode
// ============================================================================

/// What the input bar is currently collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Single-key commands.
    Command,

    /// Text of a new todo item.
    AddTodo,

    /// File path to render as a QR code.
    QrPath,

    /// Chat server host.
    ChatHost,

    /// Chat server port, after the host was entered.
    ChatPort { host: String },

    /// Chat message to send.
    ChatMessage,
}

impl InputMode {
    /// Prompt shown in the input bar.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Command => "Command: (a)Add (q)QR (c)Chat (m)Message (x)Exit > ",
            Self::AddTodo => "Add ToDo: ",
            Self::QrPath => "Enter file path for QR: ",
            Self::ChatHost => "Chat server host (e.g., localhost or 127.0.0.1): ",
            Self::ChatPort { .. } => "Port: ",
            Self::ChatMessage => "Message: ",
        }
    }

    pub fn is_text_entry(&self) -> bool {
        !matches!(self, Self::Command)
    }
}

// ============================================================================
// Chat Log
// ============================================================================

/// Origin of a chat log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Bytes received from the server.
    Remote,

    /// A line this user sent.
    Local,
}

/// One displayed chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub kind: LineKind,
    pub text: String,
}

/// Chat history assembled from unframed byte chunks.
///
/// Received bytes are split on `\n`; a trailing partial line is held until
/// more bytes arrive, and is displayed in the meantime. A partial line that
/// reaches [`MAX_PARTIAL_LINE`] bytes is completed as is.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    lines: Vec<ChatLine>,
    pending: Vec<u8>,
}

impl ChatLog {
    /// Appends received bytes.
    pub fn push_remote(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            self.push_line(LineKind::Remote, text.trim_end_matches(['\n', '\r']).to_string());
        }

        if self.pending.len() >= MAX_PARTIAL_LINE {
            self.flush_pending();
        }
    }

    /// Appends a line typed locally, completing any partial remote line first.
    pub fn push_local(&mut self, text: &str) {
        self.flush_pending();
        self.push_line(LineKind::Local, text.to_string());
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            let text = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.push_line(LineKind::Remote, text);
        }
    }

    fn push_line(&mut self, kind: LineKind, text: String) {
        self.lines.push(ChatLine { kind, text });
        if self.lines.len() > MAX_CHAT_LINES {
            let excess = self.lines.len() - MAX_CHAT_LINES;
            self.lines.drain(..excess);
        }
    }

    /// Completed lines followed by the partial line, if any.
    pub fn lines(&self) -> Vec<ChatLine> {
        let mut lines = self.lines.clone();
        if !self.pending.is_empty() {
            lines.push(ChatLine {
                kind: LineKind::Remote,
                text: String::from_utf8_lossy(&self.pending).into_owned(),
            });
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.pending.is_empty()
    }
}

// ============================================================================
// Status Message
// ============================================================================

/// Transient message shown in the input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub at: DateTime<Utc>,
}

/// Rendered QR code shown in place of the chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrView {
    pub path: String,
    pub lines: Vec<String>,
}

// ============================================================================
// Application
// ============================================================================

/// Core application state for the coshell UI.
#[derive(Debug, Clone)]
pub struct App {
    pub mode: InputMode,

    /// Text typed in the current prompt.
    pub input: String,

    /// Todo items as last read from the store.
    pub todos: Vec<String>,

    pub chat_log: ChatLog,

    pub chat: ChatState,

    /// QR code replacing the chat log until the next chat data.
    pub qr: Option<QrView>,

    pub status: Option<StatusMessage>,

    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            mode: InputMode::Command,
            input: String::new(),
            todos: Vec::new(),
            chat_log: ChatLog::default(),
            chat: ChatState::Offline,
            qr: None,
            status: None,
            should_quit: false,
        }
    }

    /// Creates an app showing the given todo items.
    pub fn with_todos(todos: Vec<String>) -> Self {
        let mut app = Self::new();
        app.todos = todos;
        app
    }

    /// Switches the input bar to `mode`, clearing any typed text.
    pub fn enter_mode(&mut self, mode: InputMode) {
        self.mode = mode;
        self.input.clear();
    }

    /// Returns to single-key command mode.
    pub fn reset_mode(&mut self) {
        self.enter_mode(InputMode::Command);
    }

    /// Takes the typed text, leaving the input empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
            at: Utc::now(),
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: true,
            at: Utc::now(),
        });
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ------------------------------------------------------------------------
    // Todo list
    // ------------------------------------------------------------------------

    /// Appends an item to the todo store and refreshes the displayed list.
    pub fn add_todo(&mut self, store: &TodoList, item: &str) {
        match store.append(item) {
            Ok(()) => {
                self.todos = store.items();
                self.set_status(format!("Added todo #{}", self.todos.len()));
            }
            Err(e) => {
                warn!(error = %e, "Failed to add todo");
                self.set_error(e.to_string());
            }
        }
    }

    // ------------------------------------------------------------------------
    // QR codes
    // ------------------------------------------------------------------------

    /// Renders `path` as a QR code into the chat pane.
    pub fn show_qr(&mut self, renderer: &dyn QrRenderer, path: &str) {
        match renderer.render(path) {
            Ok(lines) => {
                debug!(path, lines = lines.len(), "Rendered QR code");
                self.qr = Some(QrView {
                    path: path.trim().to_string(),
                    lines,
                });
                self.set_status("QR code rendered (any chat message returns to chat)");
            }
            Err(e) => {
                warn!(error = %e, "Failed to render QR code");
                self.set_error(e.to_string());
            }
        }
    }

    // ------------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------------

    pub fn chat_connecting(&mut self, target: String) {
        self.set_status(format!("Connecting to {target}..."));
        self.chat = ChatState::Connecting { target };
    }

    pub fn chat_connected(&mut self, target: String) {
        self.set_status(format!("Connected to {target}"));
        self.chat = ChatState::Connected { target };
    }

    pub fn chat_failed(&mut self, reason: String) {
        self.chat = ChatState::Offline;
        self.set_error(reason);
    }

    /// Records bytes received from the server.
    pub fn chat_received(&mut self, bytes: &[u8]) {
        self.qr = None;
        self.chat_log.push_remote(bytes);
    }

    /// Records a line this user sent.
    pub fn chat_sent(&mut self, text: &str) {
        self.qr = None;
        self.chat_log.push_local(text);
    }

    /// Marks the chat connection as ended.
    pub fn chat_closed(&mut self) {
        let target = match &self.chat {
            ChatState::Connected { target } | ChatState::Connecting { target } => target.clone(),
            ChatState::Closed { target } => target.clone(),
            ChatState::Offline => return,
        };
        if matches!(self.mode, InputMode::ChatMessage) {
            self.reset_mode();
        }
        self.set_error(format!("Connection to {target} closed"));
        self.chat = ChatState::Closed { target };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coshell_core::QrError;

    struct FakeRenderer;

    impl QrRenderer for FakeRenderer {
        fn render(&self, path: &str) -> std::result::Result<Vec<String>, QrError> {
            if path.trim().is_empty() {
                return Err(QrError::EmptyPath);
            }
            Ok(vec![format!("[qr:{path}]"), "██".to_string()])
        }
    }

    #[test]
    fn test_new_app_defaults() {
        let app = App::new();
        assert_eq!(app.mode, InputMode::Command);
        assert_eq!(app.chat, ChatState::Offline);
        assert!(app.chat_log.is_empty());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_chat_log_splits_unframed_chunks() {
        let mut log = ChatLog::default();
        log.push_remote(b"hel");
        assert_eq!(log.lines().len(), 1);
        assert_eq!(log.lines()[0].text, "hel");

        log.push_remote(b"lo\nsecond\nthi");
        let lines = log.lines();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "second", "thi"]);
    }

    #[test]
    fn test_chat_log_strips_crlf() {
        let mut log = ChatLog::default();
        log.push_remote(b"windows\r\n");
        assert_eq!(log.lines()[0].text, "windows");
    }

    #[test]
    fn test_local_line_completes_partial_remote() {
        let mut log = ChatLog::default();
        log.push_remote(b"partial");
        log.push_local("mine");
        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], ChatLine { kind: LineKind::Remote, text: "partial".into() });
        assert_eq!(lines[1], ChatLine { kind: LineKind::Local, text: "mine".into() });
    }

    #[test]
    fn test_partial_line_is_bounded() {
        let mut log = ChatLog::default();
        for _ in 0..10 {
            log.push_remote(&[b'z'; 300]);
        }
        let lines = log.lines();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.text.len() < MAX_PARTIAL_LINE + 300));
        let total: usize = lines.iter().map(|l| l.text.len()).sum();
        assert_eq!(total, 3000);
    }

    #[test]
    fn test_chat_log_is_bounded() {
        let mut log = ChatLog::default();
        for i in 0..(MAX_CHAT_LINES + 10) {
            log.push_remote(format!("line {i}\n").as_bytes());
        }
        let lines = log.lines();
        assert_eq!(lines.len(), MAX_CHAT_LINES);
        assert_eq!(lines[0].text, "line 10");
    }

    #[test]
    fn test_add_todo_updates_list_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoList::load(dir.path().join("tasks.txt"), 100).unwrap();
        let mut app = App::new();

        app.add_todo(&store, "review PR");
        assert_eq!(app.todos, vec!["review PR"]);
        assert!(!app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_add_todo_error_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = TodoList::load(dir.path().join("tasks.txt"), 0).unwrap();
        let mut app = App::new();

        app.add_todo(&store, "too many");
        assert!(app.todos.is_empty());
        let status = app.status.unwrap();
        assert!(status.is_error);
        assert!(status.text.contains("full"));
    }

    #[test]
    fn test_show_qr_then_chat_data_returns_to_chat() {
        let mut app = App::new();
        app.show_qr(&FakeRenderer, "notes.txt");
        assert_eq!(app.qr.as_ref().unwrap().lines[0], "[qr:notes.txt]");

        app.chat_received(b"hi\n");
        assert!(app.qr.is_none());
    }

    #[test]
    fn test_show_qr_failure_keeps_chat() {
        let mut app = App::new();
        app.show_qr(&FakeRenderer, "");
        assert!(app.qr.is_none());
        assert!(app.status.unwrap().is_error);
    }

    #[test]
    fn test_chat_lifecycle() {
        let mut app = App::new();
        app.chat_connecting("localhost:4000".into());
        assert!(app.chat.is_busy());

        app.chat_connected("localhost:4000".into());
        assert!(app.chat.is_connected());

        app.enter_mode(InputMode::ChatMessage);
        app.chat_closed();
        assert_eq!(app.chat, ChatState::Closed { target: "localhost:4000".into() });
        assert_eq!(app.mode, InputMode::Command);
        assert!(!app.chat.is_busy());
    }

    #[test]
    fn test_chat_closed_when_offline_is_noop() {
        let mut app = App::new();
        app.chat_closed();
        assert_eq!(app.chat, ChatState::Offline);
        assert!(app.status.is_none());
    }
}
