//! TCP broadcast server.
//!
//! The server:
//! - Listens on a TCP port on all interfaces
//! - Registers each accepted connection in the `ConnectionRegistry`
//! - Spawns a detached `ClientHandler` per registered connection
//! - Closes connections that arrive while the registry is full
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │  TcpListener    │
//! └───────┬─────────┘
//!         │ accept() + register()
//!         ▼
//! ┌─────────────────┐     ┌──────────────────────┐
//! │  ClientHandler  │────▶│  ConnectionRegistry  │
//! │  (per client)   │     │  (mutex, capacity)   │
//! └─────────────────┘     └──────────┬───────────┘
//!                                    │ broadcast
//!                                    ▼
//!                         every other connection
//! ```
//!
//! Handlers are never joined. The accept loop runs until its cancellation
//! token fires; in the binary that only happens on SIGINT/SIGTERM.

mod connection;

pub use connection::{ClientHandler, HandlerStats, READ_BUFFER_SIZE};

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::registry::{ConnectionRegistry, RegistryError, MAX_CLIENTS};

/// Chat broadcast server bound to a listening socket.
pub struct ChatServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
    cancel_token: CancellationToken,
}

impl ChatServer {
    /// Binds the listening socket.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to listen on (port 0 picks an ephemeral port)
    /// * `capacity` - Maximum number of registered connections
    /// * `cancel_token` - Stops the accept loop when cancelled
    ///
    /// # Errors
    ///
    /// `ServerError::Bind` if the address cannot be bound. There is no retry
    /// and no fallback port.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        capacity: usize,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;

        Ok(Self {
            listener,
            local_addr,
            registry: ConnectionRegistry::new(capacity),
            cancel_token,
        })
    }

    /// Binds on all interfaces at `port`.
    pub async fn bind_port(
        port: u16,
        capacity: usize,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        Self::bind(("0.0.0.0", port), capacity, cancel_token).await
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle to the connection registry.
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// Runs the accept loop.
    ///
    /// Accept errors are logged and the loop continues. Returns once the
    /// cancellation token fires; running handlers are left to finish on
    /// their own.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr,
            capacity = self.registry.capacity(),
            "Chat server listening"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.handle_connection(stream, peer),
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        info!(
            remaining = self.registry.len(),
            "Accept loop stopped"
        );
        Ok(())
    }

    /// Registers a new connection and spawns its handler.
    ///
    /// When the registry is full the stream is dropped here, which closes it
    /// without sending anything to the peer.
    fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let id = self.registry.next_id();
        let (reader, writer) = stream.into_split();

        let registration = match self.registry.register(id, writer) {
            Ok(registration) => registration,
            Err(RegistryError::Full { capacity }) => {
                warn!(peer = %peer, capacity, "Registry full, closing connection");
                return;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Failed to register connection");
                return;
            }
        };

        info!(
            conn_id = %id,
            peer = %peer,
            count = self.registry.len(),
            capacity = self.registry.capacity(),
            "Client connected"
        );

        let handler = ClientHandler::new(reader, registration);
        tokio::spawn(async move {
            let stats = handler.run().await;
            debug!(conn_id = %id, reads = stats.reads, "Handler finished");
        });
    }
}

/// Binds on all interfaces at `port` with the default capacity and runs the
/// accept loop until `cancel_token` fires.
///
/// # Errors
///
/// `ServerError::Bind` if the port cannot be bound.
pub async fn serve(port: u16, cancel_token: CancellationToken) -> Result<(), ServerError> {
    ChatServer::bind_port(port, MAX_CLIENTS, cancel_token)
        .await?
        .run()
        .await
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind listening socket: {0}")]
    Bind(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = ChatServer::bind("127.0.0.1:0", 5, CancellationToken::new())
            .await
            .unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert_eq!(server.registry().capacity(), 5);
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let first = ChatServer::bind("127.0.0.1:0", 5, CancellationToken::new())
            .await
            .unwrap();
        let err = ChatServer::bind(first.local_addr(), 5, CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to bind"));
    }

    #[tokio::test]
    async fn test_run_returns_on_cancel() {
        let cancel_token = CancellationToken::new();
        let server = ChatServer::bind("127.0.0.1:0", 5, cancel_token.clone())
            .await
            .unwrap();

        let handle = tokio::spawn(server.run());
        cancel_token.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_serve_reports_bind_failure() {
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = serve(port, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind(_)));
    }
}
