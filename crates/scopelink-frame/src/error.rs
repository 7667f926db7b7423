/// Errors that can occur during frame encoding, decoding and receiving.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The encoded frame would not fit in the 32-bit length field.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Controller data length does not match the declared sub-header length.
    #[error("controller data is {actual} bytes but the sub-header declares {declared}")]
    ControllerDataMismatch { declared: u16, actual: usize },

    /// Fewer bytes than a controller sub-header needs.
    #[error("malformed controller sub-header ({len} bytes, need 5)")]
    MalformedSubHeader { len: usize },

    /// A frame cannot fit in the receive buffer.
    #[error("receive buffer overflow ({needed} bytes needed, capacity {capacity})")]
    BufferOverflow { needed: usize, capacity: usize },

    /// An I/O error occurred while polling, reading or writing.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the connection (and its receive buffer) must be discarded.
    ///
    /// Decoding errors are scoped to a single payload; everything else means
    /// the stream can no longer be trusted.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            FrameError::Io(_) | FrameError::ConnectionClosed | FrameError::BufferOverflow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
