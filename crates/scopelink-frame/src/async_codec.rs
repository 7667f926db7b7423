//! `tokio_util` codec for running a scope link inside an async task.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, peek_frame_len, Frame, DEFAULT_BUFFER_CAPACITY};
use crate::error::{FrameError, Result};

/// Frame codec for `FramedRead` / `FramedWrite`.
///
/// Same wire rules as the blocking receiver; `max_frame_len` plays the role
/// of the fixed receive buffer capacity.
#[derive(Debug, Clone)]
pub struct ScopeCodec {
    max_frame_len: usize,
}

impl ScopeCodec {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for ScopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ScopeCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(total) = peek_frame_len(src) {
            if total > self.max_frame_len {
                return Err(FrameError::BufferOverflow {
                    needed: total,
                    capacity: self.max_frame_len,
                });
            }
            src.reserve(total.saturating_sub(src.len()));
        }

        match decode_frame(src) {
            Some(frame) => {
                src.advance(frame.wire_len());
                Ok(Some(frame))
            }
            // A header that never decodes must not grow the buffer forever.
            None if src.len() >= self.max_frame_len => Err(FrameError::BufferOverflow {
                needed: src.len() + 1,
                capacity: self.max_frame_len,
            }),
            None => Ok(None),
        }
    }
}

impl Encoder<Frame> for ScopeCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(frame.command, &frame.payload, dst)
    }
}
