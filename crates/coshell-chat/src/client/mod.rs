//! Chat client session.
//!
//! A session opens one TCP connection to the chat server, then runs two
//! things at once:
//!
//! ```text
//!   input lines ──▶ send loop ──write──▶ ┌────────────┐
//!                                        │ TcpStream  │
//!   output ◀── ReceiveTask ◀──read────── └────────────┘
//! ```
//!
//! The receive task is detached. When the send loop ends the write side is
//! shut down; the server then closes the connection and the receive task
//! notices on its own. It may still be writing to the output briefly after
//! `run` returns.
//!
//! Input and output are generic so the same session drives the `client`
//! command (stdin/stdout) and the chat pane of the terminal UI.

mod receive;

pub use receive::{ReceiveTask, CONNECTION_CLOSED_NOTICE};

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info, warn};

// ============================================================================
// Errors
// ============================================================================

/// Errors that end a session before it starts.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Name resolution failed.
    #[error("Failed to resolve host {host}: {reason}")]
    Resolve { host: String, reason: String },

    /// Resolution succeeded but produced no address.
    #[error("No address found for host {host}")]
    NoAddress { host: String },

    /// Every resolved address refused or failed the connection.
    #[error("Failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },
}

// ============================================================================
// Session
// ============================================================================

/// How a session's send loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Local input reached end of stream.
    InputClosed,

    /// Writing to the server failed.
    ConnectionLost,
}

/// Summary returned when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub lines_sent: u64,
    pub bytes_sent: u64,
}

/// An established connection to a chat server.
#[derive(Debug)]
pub struct ChatSession {
    stream: TcpStream,
    peer: SocketAddr,
}

impl ChatSession {
    /// Resolves `host` and connects to the first address that accepts.
    ///
    /// IPv4 addresses are tried before IPv6. Failures are not retried.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let mut addrs: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|e| ClientError::Resolve {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .collect();
        addrs.sort_by_key(|addr| !addr.is_ipv4());

        if addrs.is_empty() {
            return Err(ClientError::NoAddress {
                host: host.to_string(),
            });
        }

        let mut last_error = String::new();
        for addr in addrs {
            debug!(addr = %addr, "Connecting to chat server");
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    info!(addr = %addr, "Connected to chat server");
                    return Ok(Self { stream, peer: addr });
                }
                Err(e) => {
                    debug!(addr = %addr, error = %e, "Connection attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(ClientError::Connect {
            target: format!("{host}:{port}"),
            reason: last_error,
        })
    }

    /// Returns the server address this session is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Runs the session.
    ///
    /// Spawns a [`ReceiveTask`] writing to `output`, then sends each line read
    /// from `input` (newline included) until input ends or a write fails.
    pub async fn run<I, O>(self, mut input: I, output: O) -> SessionSummary
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let peer = self.peer;
        let (reader, mut writer) = self.stream.into_split();

        // Detached: observes the close through its own read.
        drop(ReceiveTask::new(reader, output).spawn());

        let mut line = Vec::new();
        let mut lines_sent = 0u64;
        let mut bytes_sent = 0u64;

        let end = loop {
            line.clear();
            match input.read_until(b'\n', &mut line).await {
                Ok(0) => break SessionEnd::InputClosed,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to read local input");
                    break SessionEnd::InputClosed;
                }
            }

            if let Err(e) = writer.write_all(&line).await {
                debug!(peer = %peer, error = %e, "Send failed");
                break SessionEnd::ConnectionLost;
            }
            lines_sent += 1;
            bytes_sent += line.len() as u64;
        };

        if let Err(e) = writer.shutdown().await {
            debug!(peer = %peer, error = %e, "Shutdown failed");
        }

        info!(peer = %peer, ?end, lines_sent, "Chat session ended");
        SessionSummary {
            end,
            lines_sent,
            bytes_sent,
        }
    }
}

/// Connects to `host:port` and runs a session over `input` and `output`.
pub async fn connect_and_run<I, O>(
    host: &str,
    port: u16,
    input: I,
    output: O,
) -> Result<SessionSummary, ClientError>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let session = ChatSession::connect(host, port).await?;
    Ok(session.run(input, output).await)
}
