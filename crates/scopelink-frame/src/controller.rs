//! Controller sub-header addressing.
//!
//! `GET`/`SET` payloads address a hardware block inside the device:
//!
//! ```text
//! ┌────────────┬──────────────┬──────────────┬──────────────┐
//! │ Controller │ Address      │ Length       │ Data         │
//! │ (1B)       │ (2B LE)      │ (2B LE)      │ (Length B)   │
//! └────────────┴──────────────┴──────────────┴──────────────┘
//! ```
//!
//! For reads the length is the number of bytes requested and no data
//! follows. Several sub-headers may be concatenated in one payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{frame_len_for, Frame};
use crate::command::Command;
use crate::error::{FrameError, Result};

/// Sub-header: controller (1) + address (2) + length (2) = 5 bytes.
pub const SUB_HEADER_SIZE: usize = 5;

/// Hardware sub-system targeted by a register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Controller {
    /// PIC microcontroller.
    Pic,
    /// Non-volatile settings ROM.
    Rom,
    /// Flash memory.
    Flash,
    /// FPGA register file.
    Fpga,
    /// Arbitrary waveform generator.
    Awg,
    /// A controller id this crate does not know; kept verbatim.
    Unknown(u8),
}

impl Controller {
    /// Map a wire id to a controller. Unrecognized ids are preserved.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Controller::Pic,
            1 => Controller::Rom,
            2 => Controller::Flash,
            3 => Controller::Fpga,
            4 => Controller::Awg,
            other => Controller::Unknown(other),
        }
    }

    /// The wire id of this controller.
    pub fn as_u8(self) -> u8 {
        match self {
            Controller::Pic => 0,
            Controller::Rom => 1,
            Controller::Flash => 2,
            Controller::Fpga => 3,
            Controller::Awg => 4,
            Controller::Unknown(value) => value,
        }
    }
}

impl From<u8> for Controller {
    fn from(value: u8) -> Self {
        Controller::from_u8(value)
    }
}

impl From<Controller> for u8 {
    fn from(controller: Controller) -> Self {
        controller.as_u8()
    }
}

/// A decoded register access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerAccess {
    pub controller: Controller,
    pub address: u16,
    /// Declared byte count: bytes requested for reads, bytes carried for writes.
    pub length: u16,
    /// Bytes following the sub-header, if any.
    pub data: Option<Bytes>,
}

impl ControllerAccess {
    /// A read request: `length` bytes starting at `address`, no data.
    pub fn read(controller: Controller, address: u16, length: u16) -> Self {
        Self {
            controller,
            address,
            length,
            data: None,
        }
    }

    /// A write carrying `data`. Fails if `data` does not fit the 16-bit length.
    pub fn write(controller: Controller, address: u16, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let length = u16::try_from(data.len()).map_err(|_| FrameError::ControllerDataMismatch {
            declared: u16::MAX,
            actual: data.len(),
        })?;
        Ok(Self {
            controller,
            address,
            length,
            data: if data.is_empty() { None } else { Some(data) },
        })
    }

    /// Bytes this entry occupied in the payload it was decoded from.
    pub fn wire_len(&self) -> usize {
        SUB_HEADER_SIZE + self.data.as_ref().map_or(0, Bytes::len)
    }

    /// Wrap this access in a frame for `command`.
    pub fn to_frame(&self, command: Command) -> Result<Frame> {
        let mut dst = BytesMut::new();
        encode_controller(
            command,
            self.controller,
            self.address,
            self.length,
            self.data.as_deref(),
            &mut dst,
        )?;
        let payload = dst.split_off(crate::codec::HEADER_SIZE).freeze();
        Ok(Frame::new(command, payload))
    }
}

/// Encode a complete frame carrying one controller sub-header.
///
/// The outer frame header is written too, so callers never wrap twice.
/// `data`, when present, must be exactly `length` bytes; on mismatch nothing
/// is written.
pub fn encode_controller(
    command: Command,
    controller: Controller,
    address: u16,
    length: u16,
    data: Option<&[u8]>,
    dst: &mut BytesMut,
) -> Result<()> {
    if let Some(data) = data {
        if data.len() != length as usize {
            return Err(FrameError::ControllerDataMismatch {
                declared: length,
                actual: data.len(),
            });
        }
    }
    let data = data.unwrap_or_default();

    let total = frame_len_for(SUB_HEADER_SIZE + data.len())?;
    dst.reserve(total);
    dst.put_u32_le(total as u32);
    dst.put_u8(command.as_u8());
    dst.put_u8(controller.as_u8());
    dst.put_u16_le(address);
    dst.put_u16_le(length);
    dst.put_slice(data);
    Ok(())
}

/// Decode the controller sub-header at the start of `payload`.
///
/// Data is whatever follows the sub-header, capped at the declared length.
/// Bytes beyond that belong to the next concatenated sub-header.
pub fn decode_controller(payload: &[u8]) -> Result<ControllerAccess> {
    if payload.len() < SUB_HEADER_SIZE {
        return Err(FrameError::MalformedSubHeader { len: payload.len() });
    }

    let controller = Controller::from_u8(payload[0]);
    let address = u16::from_le_bytes([payload[1], payload[2]]);
    let length = u16::from_le_bytes([payload[3], payload[4]]);

    let end = payload.len().min(SUB_HEADER_SIZE + length as usize);
    let data = if end > SUB_HEADER_SIZE {
        Some(Bytes::copy_from_slice(&payload[SUB_HEADER_SIZE..end]))
    } else {
        None
    };

    Ok(ControllerAccess {
        controller,
        address,
        length,
        data,
    })
}

/// Iterate over concatenated sub-headers that each carry their data.
///
/// This is the shape of `SET` writes and of `GET` replies. Read requests
/// carry a length but no data, so walk those with [`controller_requests`].
pub fn controller_entries(payload: &[u8]) -> ControllerEntries<'_> {
    ControllerEntries {
        rest: payload,
        requests: false,
        failed: false,
    }
}

/// Iterate over concatenated read requests (bare 5-byte sub-headers).
///
/// Every yielded entry has `data: None`; its length is the byte count
/// requested.
pub fn controller_requests(payload: &[u8]) -> ControllerEntries<'_> {
    ControllerEntries {
        rest: payload,
        requests: true,
        failed: false,
    }
}

/// Iterator returned by [`controller_entries`] and [`controller_requests`].
///
/// Yields one `Err` and then stops if trailing bytes are too short for a
/// sub-header.
#[derive(Debug, Clone)]
pub struct ControllerEntries<'a> {
    rest: &'a [u8],
    requests: bool,
    failed: bool,
}

impl Iterator for ControllerEntries<'_> {
    type Item = Result<ControllerAccess>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }

        let entry = if self.requests {
            &self.rest[..self.rest.len().min(SUB_HEADER_SIZE)]
        } else {
            self.rest
        };

        match decode_controller(entry) {
            Ok(entry) => {
                self.rest = &self.rest[entry.wire_len()..];
                Some(Ok(entry))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
