use crate::codec::{decode_frame, peek_frame_len, Frame, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Fixed-capacity accumulation buffer for one connection.
///
/// Bytes in `[consumed, valid_len)` are received but not yet decoded.
/// `take_frame` advances `consumed`; `compact` moves the leftover bytes to
/// the front so the free tail is as large as possible for the next read.
/// The buffer never grows: a frame larger than the capacity is an overflow.
pub struct ReceiveBuffer {
    storage: Box<[u8]>,
    valid_len: usize,
    consumed: usize,
}

impl ReceiveBuffer {
    /// Create a buffer holding at most `capacity` bytes (never less than one header).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity.max(HEADER_SIZE)].into_boxed_slice(),
            valid_len: 0,
            consumed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of received bytes not yet decoded.
    pub fn len(&self) -> usize {
        self.valid_len - self.consumed
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free space after the received bytes.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.valid_len
    }

    pub fn is_full(&self) -> bool {
        self.valid_len == self.capacity()
    }

    /// The received bytes not yet decoded.
    pub fn unconsumed(&self) -> &[u8] {
        &self.storage[self.consumed..self.valid_len]
    }

    /// Append bytes after the unconsumed region, compacting first if that
    /// makes them fit.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.remaining() && self.consumed > 0 {
            self.compact();
        }
        if data.len() > self.remaining() {
            return Err(FrameError::BufferOverflow {
                needed: self.valid_len + data.len(),
                capacity: self.capacity(),
            });
        }

        self.storage[self.valid_len..self.valid_len + data.len()].copy_from_slice(data);
        self.valid_len += data.len();
        Ok(())
    }

    /// The free tail, for reading from a stream directly into the buffer.
    ///
    /// Follow with [`commit`](Self::commit) to make the bytes visible.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.valid_len..]
    }

    /// Mark `n` bytes written into [`spare_mut`](Self::spare_mut) as received.
    pub fn commit(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(FrameError::BufferOverflow {
                needed: self.valid_len + n,
                capacity: self.capacity(),
            });
        }
        self.valid_len += n;
        Ok(())
    }

    /// Decode the next complete frame and advance past it.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A header declaring a
    /// frame larger than the whole buffer is an overflow, since waiting
    /// could never complete it.
    pub fn take_frame(&mut self) -> Result<Option<Frame>> {
        let region = self.unconsumed();
        if let Some(total) = peek_frame_len(region) {
            if total > self.capacity() {
                return Err(FrameError::BufferOverflow {
                    needed: total,
                    capacity: self.capacity(),
                });
            }
        }

        match decode_frame(region) {
            Some(frame) => {
                self.consumed += frame.wire_len();
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Move the unconsumed bytes to the start of the buffer.
    pub fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        self.storage.copy_within(self.consumed..self.valid_len, 0);
        self.valid_len -= self.consumed;
        self.consumed = 0;
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.valid_len = 0;
        self.consumed = 0;
    }
}

impl std::fmt::Debug for ReceiveBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveBuffer")
            .field("capacity", &self.capacity())
            .field("valid_len", &self.valid_len)
            .field("consumed", &self.consumed)
            .finish()
    }
}
