//! coshell Core - Shared services for the terminal collaboration tool
//!
//! This crate provides the pieces shared between the chat binary modes
//! and the split-pane UI:
//! - `config` - TOML configuration with defaults
//! - `todo` - flat-file backed todo list
//! - `qr` - QR code rendering through an external program
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod config;
pub mod qr;
pub mod todo;

// Re-exports for convenience
pub use config::{Config, ConfigError, QrConfig, ServerConfig, TodoConfig};
pub use qr::{QrEncode, QrError, QrRenderer};
pub use todo::{TodoError, TodoList};
