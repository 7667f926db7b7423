//! Stream connection abstraction for scope links.
//!
//! Provides the byte-stream collaborator the framing layer reads from and
//! writes to:
//! - [`Connection`]: `Read + Write` plus bounded readiness polling
//! - [`NetStream`]: a connected TCP stream (or a Unix socket pair on unix)
//! - [`TcpTransport`]: blocking connect / bind / accept helpers
//!
//! This is the lowest layer of scopelink. Device discovery and reconnection
//! policy live above it.

pub mod error;
pub mod poll;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::TcpTransport;
pub use traits::{Connection, NetStream};
