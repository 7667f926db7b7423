//! Framed command transport between host software and measurement hardware.
//!
//! scopelink turns a TCP byte stream into an ordered sequence of typed
//! command frames, and command intents (including controller register
//! reads and writes) into ready-to-send bytes.
//!
//! # Crate Structure
//!
//! - [`transport`]: Stream connections with readiness polling (TCP, socket pairs)
//! - [`frame`]: Frame codec, controller sub-headers, receive buffer, receiver and writer
//! - [`config`]: Serializable link configuration
//! - [`link`]: One connection: a blocking receiver plus a shareable sender
//! - [`logging`]: `tracing` subscriber setup (behind `logging` feature)

pub mod config;
pub mod error;
pub mod link;

#[cfg(feature = "logging")]
pub mod logging;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use link::{Link, LinkCloser, LinkSender};

/// Re-export transport types.
pub mod transport {
    pub use scopelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use scopelink_frame::*;
}

/// DNS-SD service type advertised by network-attached devices.
pub const SERVICE_TYPE: &str = "_sss._tcp";

/// DNS-SD reply domain for device discovery.
pub const REPLY_DOMAIN: &str = "local.";

/// TXT record key carrying the acquisition data port.
pub const TXT_DATA_PORT: &str = "DATA_PORT";

/// Protocol version reported in response to `SERVER_VERSION`.
pub const PROTOCOL_VERSION: &str = "0.0.0.1";
