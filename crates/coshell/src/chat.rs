//! Bridge between the UI event loop and a chat session.
//!
//! The chat pane runs the same [`ChatSession`] as the `client` command. Its
//! input and output are in-memory pipes instead of stdin/stdout:
//!
//! ```text
//!   ChatLink::send_line ──mpsc──▶ keyboard pipe ──▶ ChatSession ──▶ server
//!   Event::ChatData ◀── screen pump ◀── screen pipe ◀── ReceiveTask ◀─┘
//! ```
//!
//! The screen pipe closes when the session's receive task finishes, which
//! the pump reports as [`Event::ChatClosed`].
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use coshell_chat::ChatSession;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::input::Event;

/// Capacity of each in-memory pipe.
const PIPE_CAPACITY: usize = 8 * 1024;

/// Chunk size for forwarding session output to the UI.
const SCREEN_CHUNK: usize = 1024;

// ============================================================================
// Chat Link
// ============================================================================

/// Handle for sending lines into a running chat session.
///
/// Dropping the link ends the session's input, which closes the connection.
#[derive(Debug, Clone)]
pub struct ChatLink {
    lines_tx: mpsc::UnboundedSender<String>,
}

impl ChatLink {
    /// Queues one line for sending. A newline is appended.
    ///
    /// Returns `false` if the session has already ended.
    pub fn send_line(&self, line: &str) -> bool {
        self.lines_tx.send(line.to_string()).is_ok()
    }
}

/// Connects to `host:port` in the background and bridges the session to
/// the UI.
///
/// Progress is reported on `event_tx`: [`Event::ChatConnected`] or
/// [`Event::ChatFailed`], then [`Event::ChatData`] chunks, then
/// [`Event::ChatClosed`]. Cancelling `cancel_token` ends the session's input.
pub fn spawn_chat(
    host: String,
    port: u16,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> ChatLink {
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_chat(host, port, lines_rx, event_tx, cancel_token));
    ChatLink { lines_tx }
}

async fn run_chat(
    host: String,
    port: u16,
    lines_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) {
    let session = match ChatSession::connect(&host, port).await {
        Ok(session) => session,
        Err(e) => {
            info!(host = %host, port, error = %e, "Chat connection failed");
            let _ = event_tx.send(Event::ChatFailed(e.to_string()));
            return;
        }
    };

    let target = session.peer_addr().to_string();
    let _ = event_tx.send(Event::ChatConnected {
        target: target.clone(),
    });

    let (keyboard_w, keyboard_r) = duplex(PIPE_CAPACITY);
    let (screen_w, screen_r) = duplex(PIPE_CAPACITY);

    tokio::spawn(pump_screen(screen_r, event_tx));
    tokio::spawn(feed_keyboard(lines_rx, keyboard_w, cancel_token));

    let summary = session.run(BufReader::new(keyboard_r), screen_w).await;
    info!(
        peer = %target,
        end = ?summary.end,
        lines_sent = summary.lines_sent,
        "Chat pane session ended"
    );
}

/// Forwards session output to the UI until the pipe closes.
async fn pump_screen(mut screen: DuplexStream, event_tx: mpsc::UnboundedSender<Event>) {
    let mut buf = [0u8; SCREEN_CHUNK];
    loop {
        match screen.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = buf.get(..n).unwrap_or_default().to_vec();
                if event_tx.send(Event::ChatData(chunk)).is_err() {
                    // UI is gone
                    return;
                }
            }
        }
    }
    let _ = event_tx.send(Event::ChatClosed);
}

/// Writes queued lines into the session's input until the link is dropped
/// or the token is cancelled.
async fn feed_keyboard(
    mut lines_rx: mpsc::UnboundedReceiver<String>,
    mut keyboard: DuplexStream,
    cancel_token: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            _ = cancel_token.cancelled() => break,
            line = lines_rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        if let Err(e) = keyboard.write_all(&bytes).await {
            debug!(error = %e, "Chat session input closed");
            break;
        }
    }
    // Dropping the pipe ends the session's input.
}
