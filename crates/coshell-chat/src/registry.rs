//! Connection registry shared by the accept loop and every client handler.
//!
//! The registry is the only shared mutable state of the chat server. It is a
//! bounded set of live connections guarded by a single mutex:
//!
//! ```text
//!   accept loop ──register──▶ ┌──────────────────────┐
//!                             │  ConnectionRegistry  │
//!   handler A ──broadcast───▶ │  Mutex<Vec<Peer>>    │ ──write──▶ B, C, ...
//!   handler A ──(drop)──────▶ │  capacity: 5         │
//!                             └──────────────────────┘
//! ```
//!
//! Registration hands back a [`Registration`] guard; dropping it unregisters
//! the connection, so every exit path of a handler reaches unregistration.
//!
//! Broadcast copies the recipient list while holding the lock and performs
//! all writes after releasing it. Each connection's writer has its own async
//! mutex, so one payload is never interleaved with another at a recipient.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A poisoned registry lock is recovered, never propagated

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, trace};

/// Maximum number of concurrently registered connections.
pub const MAX_CLIENTS: usize = coshell_core::config::DEFAULT_MAX_CLIENTS;

// ============================================================================
// Connection Identity
// ============================================================================

/// Process-unique identifier of one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Shared write handle of one connection.
pub type PeerWriter<W = OwnedWriteHalf> = Arc<tokio::sync::Mutex<W>>;

struct Peer<W> {
    id: ConnectionId,
    writer: PeerWriter<W>,
}

// ============================================================================
// Errors and Reports
// ============================================================================

/// Errors returned by [`ConnectionRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The registry already holds `capacity` connections.
    #[error("Registry full (capacity: {capacity})")]
    Full { capacity: usize },

    /// The id is already registered.
    #[error("Connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}

/// Outcome of one broadcast, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Recipients that accepted the whole payload.
    pub delivered: usize,

    /// Recipients whose write failed. Failures are never retried.
    pub failed: usize,
}

// ============================================================================
// Registry
// ============================================================================

struct Inner<W> {
    capacity: usize,
    next_id: AtomicU64,
    peers: Mutex<Vec<Peer<W>>>,
}

/// Bounded, mutex-guarded set of live server-side connections.
///
/// Cheap to clone; all clones share the same set.
pub struct ConnectionRegistry<W = OwnedWriteHalf> {
    inner: Arc<Inner<W>>,
}

impl<W> Clone for ConnectionRegistry<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> fmt::Debug for ConnectionRegistry<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl<W> Default for ConnectionRegistry<W> {
    fn default() -> Self {
        Self::new(MAX_CLIENTS)
    }
}

impl<W> ConnectionRegistry<W> {
    /// Creates an empty registry holding at most `capacity` connections.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                next_id: AtomicU64::new(1),
                peers: Mutex::new(Vec::with_capacity(capacity)),
            }),
        }
    }

    fn peers(&self) -> MutexGuard<'_, Vec<Peer<W>>> {
        self.inner
            .peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates a fresh connection id.
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Adds a connection if there is room.
    ///
    /// On failure the writer is dropped; the caller is expected to drop the
    /// rest of the connection as well so the peer observes a close.
    pub fn register(&self, id: ConnectionId, writer: W) -> Result<Registration<W>, RegistryError> {
        let writer = Arc::new(tokio::sync::Mutex::new(writer));
        let mut peers = self.peers();

        if peers.iter().any(|peer| peer.id == id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        if peers.len() >= self.inner.capacity {
            return Err(RegistryError::Full {
                capacity: self.inner.capacity,
            });
        }

        peers.push(Peer {
            id,
            writer: Arc::clone(&writer),
        });
        debug!(conn_id = %id, count = peers.len(), "Registered connection");

        Ok(Registration {
            registry: self.clone(),
            id,
            writer,
        })
    }

    /// Removes a connection. Returns `false` if it was not registered.
    ///
    /// Removal swaps with the last entry, so iteration order of the
    /// remaining connections is not preserved.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut peers = self.peers();
        match peers.iter().position(|peer| peer.id == id) {
            Some(index) => {
                peers.swap_remove(index);
                debug!(conn_id = %id, count = peers.len(), "Unregistered connection");
                true
            }
            None => false,
        }
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.peers().iter().any(|peer| peer.id == id)
    }

    /// Ids of the registered connections, in iteration order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.peers().iter().map(|peer| peer.id).collect()
    }

    /// Copies the recipients of a broadcast from `from` while holding the lock.
    fn recipients(&self, from: ConnectionId) -> Vec<(ConnectionId, PeerWriter<W>)> {
        self.peers()
            .iter()
            .filter(|peer| peer.id != from)
            .map(|peer| (peer.id, Arc::clone(&peer.writer)))
            .collect()
    }
}

impl<W> ConnectionRegistry<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Writes `payload` to every registered connection except `from`.
    ///
    /// Recipients are those registered when the lock is taken. A failed write
    /// to one recipient does not stop delivery to the others, and nothing is
    /// reported back to the sender beyond the returned counts.
    pub async fn broadcast(&self, from: ConnectionId, payload: &[u8]) -> BroadcastReport {
        let recipients = self.recipients(from);
        let mut report = BroadcastReport::default();

        for (id, writer) in recipients {
            let mut writer = writer.lock().await;
            let result = async {
                writer.write_all(payload).await?;
                writer.flush().await
            }
            .await;

            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!(conn_id = %id, from = %from, error = %e, "Broadcast write failed");
                    report.failed += 1;
                }
            }
        }

        trace!(
            from = %from,
            bytes = payload.len(),
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );
        report
    }
}

// ============================================================================
// Registration Guard
// ============================================================================

/// Membership of one connection in the registry.
///
/// Dropping the guard unregisters the connection.
pub struct Registration<W = OwnedWriteHalf> {
    registry: ConnectionRegistry<W>,
    id: ConnectionId,
    writer: PeerWriter<W>,
}

impl<W> Registration<W> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Write handle of this connection.
    pub fn writer(&self) -> PeerWriter<W> {
        Arc::clone(&self.writer)
    }

    pub fn registry(&self) -> &ConnectionRegistry<W> {
        &self.registry
    }
}

impl<W> Registration<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Unregisters the connection, then shuts down its write side.
    ///
    /// If a broadcast is still writing to this connection the shutdown is
    /// skipped; the socket closes once that broadcast releases the writer.
    pub async fn close(self) {
        self.registry.unregister(self.id);

        match self.writer.try_lock() {
            Ok(mut writer) => {
                if let Err(e) = writer.shutdown().await {
                    debug!(conn_id = %self.id, error = %e, "Shutdown failed");
                }
            }
            Err(_) => {
                debug!(conn_id = %self.id, "Writer busy, skipping shutdown");
            }
        }
    }
}

impl<W> Drop for Registration<W> {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    type TestRegistry = ConnectionRegistry<DuplexStream>;

    /// Registers a duplex pipe, returning the guard and the far end to read from.
    fn register_pipe(registry: &TestRegistry) -> (Registration<DuplexStream>, DuplexStream) {
        let (near, far) = duplex(4096);
        let id = registry.next_id();
        let registration = registry.register(id, near).expect("register");
        (registration, far)
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = TestRegistry::new(5);
        let a = registry.next_id();
        let b = registry.next_id();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), format!("conn-{}", a.as_u64()));
    }

    #[test]
    fn test_capacity_enforced() {
        let registry = TestRegistry::new(MAX_CLIENTS);
        let mut guards = Vec::new();
        for _ in 0..MAX_CLIENTS {
            guards.push(register_pipe(&registry));
        }
        assert_eq!(registry.len(), MAX_CLIENTS);

        let (near, _far) = duplex(64);
        let err = registry.register(registry.next_id(), near).err();
        assert_eq!(err, Some(RegistryError::Full { capacity: 5 }));
        assert_eq!(registry.len(), MAX_CLIENTS);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = TestRegistry::new(5);
        let (registration, _far) = register_pipe(&registry);

        let (near, _far2) = duplex(64);
        let err = registry.register(registration.id(), near).err();
        assert_eq!(err, Some(RegistryError::AlreadyRegistered(registration.id())));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_drop_unregisters() {
        let registry = TestRegistry::new(5);
        let (registration, _far) = register_pipe(&registry);
        let id = registration.id();
        assert!(registry.contains(id));

        drop(registration);
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = TestRegistry::new(5);
        let (_registration, _far) = register_pipe(&registry);
        assert!(!registry.unregister(ConnectionId::new(9999)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_swaps_with_last() {
        let registry = TestRegistry::new(5);
        let (a, _fa) = register_pipe(&registry);
        let (b, _fb) = register_pipe(&registry);
        let (c, _fc) = register_pipe(&registry);
        let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());

        drop(a);
        assert_eq!(registry.ids(), vec![c_id, b_id]);
        drop(b);
        drop(c);
    }

    #[test]
    fn test_slot_reusable_after_unregister() {
        let registry = TestRegistry::new(1);
        let (first, _f1) = register_pipe(&registry);
        drop(first);
        let (_second, _f2) = register_pipe(&registry);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let registry = TestRegistry::new(5);
        let (a, mut a_far) = register_pipe(&registry);
        let (_b, mut b_far) = register_pipe(&registry);
        let (_c, mut c_far) = register_pipe(&registry);

        let report = registry.broadcast(a.id(), b"hello\n").await;
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });

        let mut buf = [0u8; 6];
        b_far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");
        c_far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");

        // Nothing was written back to the sender.
        drop(a);
        let mut rest = Vec::new();
        a_far.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_skips_broken_recipient() {
        let registry = TestRegistry::new(5);
        let (sender, _sender_far) = register_pipe(&registry);
        let (_broken, broken_far) = register_pipe(&registry);
        let (_b, mut b_far) = register_pipe(&registry);
        let (_c, mut c_far) = register_pipe(&registry);

        drop(broken_far);

        let payload = b"best effort payload";
        let report = registry.broadcast(sender.id(), payload).await;
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });

        let mut buf = vec![0u8; payload.len()];
        b_far.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, payload);
        c_far.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, payload);
    }

    #[tokio::test]
    async fn test_broadcast_after_unregister_skips_peer() {
        let registry = TestRegistry::new(5);
        let (sender, _sender_far) = register_pipe(&registry);
        let (gone, _gone_far) = register_pipe(&registry);
        let (_b, _b_far) = register_pipe(&registry);

        drop(gone);
        assert_eq!(registry.len(), 2);

        let report = registry.broadcast(sender.id(), b"x").await;
        assert_eq!(report.delivered + report.failed, 1);
    }

    #[tokio::test]
    async fn test_close_shuts_down_writer() {
        let registry = TestRegistry::new(5);
        let (registration, mut far) = register_pipe(&registry);

        let id = registration.id();

        registration.close().await;
        let mut rest = Vec::new();
        far.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn test_close_unregisters_while_writer_busy() {
        let registry = TestRegistry::new(5);
        let (registration, _far) = register_pipe(&registry);
        let id = registration.id();

        // A stalled broadcast holds the writer lock.
        let writer = registration.writer();
        let held = writer.lock().await;

        tokio::time::timeout(std::time::Duration::from_secs(1), registration.close())
            .await
            .expect("close must not wait for the writer");
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
        drop(held);
    }
}
