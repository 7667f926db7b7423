use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::Command;
use crate::error::{FrameError, Result};

/// Frame header: total length (4) + command (1) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Largest total frame length the 32-bit length field can express.
pub const MAX_FRAME_LEN: usize = u32::MAX as usize;

/// Default receive buffer capacity: 8 KiB.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Default bound on a single readiness wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A framed command message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The command opcode.
    pub command: Command,
    /// The message payload, owned by the frame. Empty for header-only frames.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: Command, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// Create a frame without payload.
    pub fn header_only(command: Command) -> Self {
        Self {
            command,
            payload: Bytes::new(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// The payload, or `None` for a header-only frame.
    pub fn payload(&self) -> Option<&[u8]> {
        if self.payload.is_empty() {
            None
        } else {
            Some(&self.payload)
        }
    }

    /// Encode this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(self.wire_len());
        encode_frame(self.command, &self.payload, &mut dst)?;
        Ok(dst.freeze())
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────┬─────────┬──────────────────────┐
/// │ Length (4B LE) │ Command │ Payload              │
/// │ 5 + payload    │ (1B)    │ (Length - 5 bytes)   │
/// └────────────────┴─────────┴──────────────────────┘
/// ```
pub fn encode_frame(command: Command, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let total = frame_len_for(payload.len())?;
    dst.reserve(total);
    dst.put_u32_le(total as u32);
    dst.put_u8(command.as_u8());
    dst.put_slice(payload);
    Ok(())
}

/// Total wire length of a frame carrying `payload_len` bytes.
pub(crate) fn frame_len_for(payload_len: usize) -> Result<usize> {
    match HEADER_SIZE.checked_add(payload_len) {
        Some(total) if total <= MAX_FRAME_LEN => Ok(total),
        _ => Err(FrameError::FrameTooLarge {
            size: payload_len.saturating_add(HEADER_SIZE),
            max: MAX_FRAME_LEN,
        }),
    }
}

/// Read the declared total length of the frame at the start of `src`.
///
/// Returns `None` if the header is incomplete or the length field cannot
/// describe a frame. A length of 0 is the "nothing here yet" sentinel; values
/// below the header size are treated the same way.
pub fn peek_frame_len(src: &[u8]) -> Option<usize> {
    if src.len() < HEADER_SIZE {
        return None;
    }

    let total = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if total < HEADER_SIZE {
        return None;
    }

    Some(total)
}

/// Decode the frame at the start of `src`.
///
/// Returns `None` if `src` doesn't contain a complete frame yet. The payload
/// is copied, so the caller may reuse `src` as soon as this returns. Nothing
/// is consumed; the caller advances by [`Frame::wire_len`].
pub fn decode_frame(src: &[u8]) -> Option<Frame> {
    let total = peek_frame_len(src)?;
    if src.len() < total {
        return None; // Need more data
    }

    Some(Frame {
        command: Command::from_u8(src[HEADER_SIZE - 1]),
        payload: Bytes::copy_from_slice(&src[HEADER_SIZE..total]),
    })
}

/// Configuration for receiving and sending frames.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Receive buffer capacity; also the largest frame that can be received.
    /// Default: 8 KiB.
    pub buffer_capacity: usize,
    /// Bound on each readiness wait. Waits are retried, so this only limits
    /// how long a single poll blocks. Default: 1 s.
    pub poll_interval: Duration,
    /// Write timeout for blocking sends.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode_set_frame() {
        let mut buf = BytesMut::new();
        encode_frame(Command::Set, &[0x01, 0x02, 0x03], &mut buf).unwrap();

        assert_eq!(buf.as_ref(), &[0x08, 0x00, 0x00, 0x00, 0x19, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_decode_set_frame() {
        let wire = [0x08, 0x00, 0x00, 0x00, 0x19, 0x01, 0x02, 0x03];
        let frame = decode_frame(&wire).unwrap();

        assert_eq!(frame.command, Command::Set);
        assert_eq!(frame.payload.as_ref(), &[0x01, 0x02, 0x03]);
        assert_eq!(frame.wire_len(), wire.len());
    }

    #[test]
    fn test_header_only_frame() {
        let frame = Frame::header_only(Command::Flush);
        let wire = frame.to_bytes().unwrap();
        assert_eq!(wire.as_ref(), &[0x05, 0x00, 0x00, 0x00, 0x0e]);

        let decoded = decode_frame(&wire).unwrap();
        assert_eq!(decoded.command, Command::Flush);
        assert!(decoded.payload().is_none());
        assert!(!decoded.has_payload());
    }

    #[test]
    fn test_decode_incomplete_header() {
        assert!(decode_frame(&[0x08, 0x00, 0x00]).is_none());
        assert!(decode_frame(&[]).is_none());
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let wire = [0x08, 0x00, 0x00, 0x00, 0x19, 0x01, 0x02];
        assert!(decode_frame(&wire).is_none());
    }

    #[test]
    fn test_zero_length_is_sentinel() {
        let wire = [0x00, 0x00, 0x00, 0x00, 0x19, 0x01, 0x02, 0x03];
        assert!(decode_frame(&wire).is_none());
        assert!(peek_frame_len(&wire).is_none());
    }

    #[test]
    fn test_undersized_length_never_decodes() {
        for len in 1u8..HEADER_SIZE as u8 {
            let wire = [len, 0x00, 0x00, 0x00, 0x0e, 0xaa, 0xbb];
            assert!(decode_frame(&wire).is_none(), "length {len} decoded");
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let wire = [0x06, 0x00, 0x00, 0x00, 0x1a, 0x42, 0xff, 0xff];
        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.command, Command::Data);
        assert_eq!(frame.payload.as_ref(), &[0x42]);
    }

    #[test]
    fn test_decode_is_repeatable() {
        let wire = [0x06, 0x00, 0x00, 0x00, 0x1a, 0x42];
        assert_eq!(decode_frame(&wire), decode_frame(&wire));
    }

    #[test]
    fn test_unknown_command_decodes() {
        let wire = [0x05, 0x00, 0x00, 0x00, 0x77];
        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.command, Command::Unknown(0x77));
    }

    #[test]
    fn test_frame_len_overflow_rejected() {
        let err = frame_len_for(MAX_FRAME_LEN).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert_eq!(frame_len_for(MAX_FRAME_LEN - HEADER_SIZE).unwrap(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_peek_reports_declared_length() {
        let wire = [0x00, 0x01, 0x00, 0x00, 0x1a];
        assert_eq!(peek_frame_len(&wire), Some(256));
    }

    #[test]
    fn test_default_config() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert!(cfg.write_timeout.is_none());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(opcode in any::<u8>(), payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let command = Command::from_u8(opcode);
            let mut buf = BytesMut::new();
            encode_frame(command, &payload, &mut buf).unwrap();

            prop_assert_eq!(buf.len(), HEADER_SIZE + payload.len());
            let frame = decode_frame(&buf).unwrap();
            prop_assert_eq!(frame.command, command);
            prop_assert_eq!(frame.payload.as_ref(), payload.as_slice());
        }

        #[test]
        fn prop_zero_length_never_decodes(tail in proptest::collection::vec(any::<u8>(), 1..64)) {
            let mut wire = vec![0u8; 4];
            wire.extend_from_slice(&tail);
            prop_assert!(decode_frame(&wire).is_none());
        }
    }
}
