use std::path::PathBuf;

/// Errors that can occur on a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] scopelink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] scopelink_frame::FrameError),

    /// Failed to read a configuration file.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration was not valid JSON for [`LinkConfig`](crate::LinkConfig).
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    ConfigValue {
        field: &'static str,
        reason: &'static str,
    },

    /// A sender panicked while holding the write lock.
    #[error("link sender lock poisoned")]
    Poisoned,
}

impl LinkError {
    /// True when the link must be dropped and, if desired, re-established.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            LinkError::Transport(_) | LinkError::Poisoned => true,
            LinkError::Frame(err) => err.is_connection_lost(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
