//! coshell Chat - Broadcast chat server and client
//!
//! This crate provides the networked half of coshell:
//! - `registry` - Bounded, mutex-guarded set of live connections
//! - `server` - TCP accept loop and per-connection relay handlers
//! - `client` - Chat session with a concurrent receive task
//!
//! # Wire Protocol
//!
//! Raw TCP bytes. No framing, header, length prefix or handshake. Whatever
//! one read returns (up to 1024 bytes) is relayed as-is to every other
//! connected client, so line and message boundaries are not preserved:
//! a line may arrive in pieces and back-to-back lines may arrive merged.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Per-connection errors end that connection only

pub mod client;
pub mod registry;
pub mod server;

pub use client::{connect_and_run, ChatSession, ClientError, SessionEnd, SessionSummary};
pub use registry::{ConnectionId, ConnectionRegistry, RegistryError, MAX_CLIENTS};
pub use server::{serve, ChatServer, ServerError};
