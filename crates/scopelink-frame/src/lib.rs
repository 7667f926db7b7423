//! Length-prefixed command framing for scope links.
//!
//! Every message on the wire is framed with:
//! - A 4-byte little-endian total length (header included)
//! - A 1-byte command opcode
//!
//! Register-style `GET`/`SET` payloads additionally carry a 5-byte controller
//! sub-header addressing a hardware block (FPGA registers, flash, PIC, ...).
//!
//! No partial reads, no offset bookkeeping in user code.

pub mod buffer;
pub mod codec;
pub mod command;
pub mod controller;
pub mod error;
pub mod receiver;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use buffer::ReceiveBuffer;
pub use codec::{
    decode_frame, encode_frame, peek_frame_len, Frame, FrameConfig, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_POLL_INTERVAL, HEADER_SIZE, MAX_FRAME_LEN,
};
pub use command::Command;
pub use controller::{
    controller_entries, controller_requests, decode_controller, encode_controller, Controller,
    ControllerAccess, ControllerEntries, SUB_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use receiver::FrameReceiver;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::ScopeCodec;
