use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use scopelink_transport::NetStream;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::command::Command;
use crate::controller::{encode_controller, Controller, ControllerAccess};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Each send is encoded into a reused buffer and written in full before
/// returning. Any write error leaves the stream in an unknown state and
/// should be treated as fatal for the connection.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.command, frame.payload.as_ref())
    }

    /// Encode and send a command with an optional payload.
    pub fn send(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(command, payload, &mut self.buf)?;
        trace!(%command, len = self.buf.len(), "sending frame");
        self.write_buffered()
    }

    /// Encode and send a controller register access.
    ///
    /// `data`, when present, must be exactly `length` bytes.
    pub fn send_controller(
        &mut self,
        command: Command,
        controller: Controller,
        address: u16,
        length: u16,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.buf.clear();
        encode_controller(command, controller, address, length, data, &mut self.buf)?;
        trace!(%command, ?controller, address, length, "sending controller access");
        self.write_buffered()
    }

    /// Send a prepared controller access.
    pub fn send_access(&mut self, command: Command, access: &ControllerAccess) -> Result<()> {
        self.send_controller(
            command,
            access.controller,
            access.address,
            access.length,
            access.data.as_deref(),
        )
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<NetStream> {
    /// Create a frame writer for a `NetStream` and apply the write timeout from config.
    pub fn with_config_net(inner: NetStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn transport_to_frame_error(err: scopelink_transport::TransportError) -> FrameError {
    match err {
        scopelink_transport::TransportError::Io(io)
        | scopelink_transport::TransportError::Accept(io) => FrameError::Io(io),
        scopelink_transport::TransportError::Bind { source, .. }
        | scopelink_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
    }
}
