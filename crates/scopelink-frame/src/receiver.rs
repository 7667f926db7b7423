use std::collections::VecDeque;
use std::io::ErrorKind;

use scopelink_transport::Connection;
use tracing::{debug, info, trace, warn};

use crate::buffer::ReceiveBuffer;
use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Receives complete frames from a [`Connection`].
///
/// Owns the connection's receive buffer. Each call blocks until at least one
/// whole frame is available or the connection fails; after any error the
/// receiver and its connection should be dropped.
pub struct FrameReceiver<T> {
    inner: T,
    buf: ReceiveBuffer,
    pending: VecDeque<Frame>,
    config: FrameConfig,
}

impl<T: Connection> FrameReceiver<T> {
    /// Create a new frame receiver with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame receiver with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: ReceiveBuffer::with_capacity(config.buffer_capacity),
            pending: VecDeque::new(),
            config,
        }
    }

    /// Receive every frame that is complete once at least one is (blocking).
    ///
    /// Frames come back in wire order. Bytes of a trailing partial frame stay
    /// buffered for the next call.
    pub fn receive(&mut self) -> Result<Vec<Frame>> {
        if !self.pending.is_empty() {
            return Ok(self.pending.drain(..).collect());
        }

        loop {
            let frames = self.drain_buffered()?;
            if !frames.is_empty() {
                debug!(
                    frames = frames.len(),
                    leftover = self.buf.len(),
                    "received frame batch"
                );
                return Ok(frames);
            }

            self.wait_readable()?;
            self.fill()?;
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when the peer closes.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let batch = self.receive()?;
            self.pending.extend(batch);
        }
    }

    /// Decode all complete frames in the buffer and compact the leftover.
    fn drain_buffered(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        loop {
            match self.buf.take_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                // Hand out what was decoded; the bad header fails the next call.
                Err(_) if !frames.is_empty() => break,
                Err(err) => {
                    warn!(error = %err, "dropping connection");
                    return Err(err);
                }
            }
        }

        if !frames.is_empty() {
            self.buf.compact();
        }
        Ok(frames)
    }

    /// Block until the connection has bytes (or has failed).
    fn wait_readable(&mut self) -> Result<()> {
        loop {
            match self.inner.poll_readable(self.config.poll_interval) {
                Ok(true) => return Ok(()),
                Ok(false) => trace!("no data within poll interval"),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    info!(error = %err, "connection closed unexpectedly");
                    return Err(FrameError::Io(err));
                }
            }
        }
    }

    /// Read once into the free tail of the buffer.
    fn fill(&mut self) -> Result<()> {
        if self.buf.is_full() {
            warn!(
                capacity = self.buf.capacity(),
                "receive buffer full without a complete frame"
            );
            return Err(FrameError::BufferOverflow {
                needed: self.buf.len() + 1,
                capacity: self.buf.capacity(),
            });
        }

        let read = match self.inner.read(self.buf.spare_mut()) {
            Ok(n) => n,
            Err(err)
                if err.kind() == ErrorKind::Interrupted || err.kind() == ErrorKind::WouldBlock =>
            {
                return Ok(())
            }
            Err(err) => {
                info!(error = %err, "connection closed unexpectedly");
                return Err(FrameError::Io(err));
            }
        };

        if read == 0 {
            info!(buffered = self.buf.len(), "connection closed by peer");
            return Err(FrameError::ConnectionClosed);
        }

        self.buf.commit(read)?;
        trace!(bytes = read, buffered = self.buf.len(), "bytes received");
        Ok(())
    }
}

impl<T> FrameReceiver<T> {
    /// Borrow the underlying connection.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying connection.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the receiver and return the inner connection.
    ///
    /// Buffered bytes are discarded.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Bytes received but not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// The receive buffer.
    pub fn buffer(&self) -> &ReceiveBuffer {
        &self.buf
    }

    /// Current frame receiver configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
