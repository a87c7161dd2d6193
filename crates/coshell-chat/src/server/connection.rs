//! Per-connection handler.
//!
//! Each accepted connection gets its own `ClientHandler` that:
//! - Reads raw bytes from its socket into a fixed buffer
//! - Relays each read, exactly as received, to every other connection
//! - Closes and unregisters itself when the peer closes or a read fails
//!
//! There is no framing: one read may hold part of a line or several lines,
//! and that split is what the other connections see.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info};

use crate::registry::{ConnectionId, Registration};

/// Size of the read buffer; one read relays at most this many bytes.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Counters reported when a handler finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Successful reads, i.e. broadcasts issued.
    pub reads: u64,

    /// Bytes read from the peer.
    pub bytes: u64,
}

/// Handler for a single server-side connection.
pub struct ClientHandler<R = OwnedReadHalf, W = OwnedWriteHalf> {
    reader: R,
    registration: Registration<W>,
}

impl<R, W> ClientHandler<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a handler reading from `reader` on behalf of `registration`.
    pub fn new(reader: R, registration: Registration<W>) -> Self {
        Self {
            reader,
            registration,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.registration.id()
    }

    /// Runs the read-and-relay loop until the peer closes or a read fails.
    ///
    /// On return the connection is closed and no longer registered.
    pub async fn run(mut self) -> HandlerStats {
        let id = self.registration.id();
        let mut stats = HandlerStats::default();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        debug!(conn_id = %id, "Client handler started");

        loop {
            let n = match self.reader.read(&mut buf).await {
                Ok(0) => {
                    debug!(conn_id = %id, "Peer closed connection");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    debug!(conn_id = %id, error = %e, "Read failed");
                    break;
                }
            };

            stats.reads += 1;
            stats.bytes += n as u64;

            let payload = buf.get(..n).unwrap_or_default();
            let report = self.registration.registry().broadcast(id, payload).await;
            debug!(
                conn_id = %id,
                bytes = n,
                delivered = report.delivered,
                failed = report.failed,
                "Relayed message"
            );
        }

        self.registration.close().await;

        info!(
            conn_id = %id,
            reads = stats.reads,
            bytes = stats.bytes,
            "Client disconnected"
        );
        stats
    }
}
