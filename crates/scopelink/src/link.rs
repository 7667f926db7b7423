use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};

use scopelink_frame::{Command, Controller, ControllerAccess, Frame, FrameReceiver, FrameWriter};
use scopelink_transport::{NetStream, TcpTransport};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// One connection to a device.
///
/// The receiving half is owned by the `Link` and blocks in [`receive`](Self::receive).
/// Sending goes through a [`LinkSender`], which can be cloned into other
/// threads; concurrent sends are serialized by a lock that receives never take.
/// After any connection-level error the link should be dropped.
pub struct Link {
    receiver: FrameReceiver<NetStream>,
    sender: LinkSender,
    closer: LinkCloser,
}

impl Link {
    /// Connect to a device over TCP.
    pub fn connect(addr: impl ToSocketAddrs, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        let stream = TcpTransport::connect(addr, config.connect_timeout())?;
        stream.set_nodelay(config.nodelay)?;
        Self::from_stream(stream, config)
    }

    /// Build a link over an already connected stream.
    pub fn from_stream(stream: NetStream, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        let frame_config = config.frame_config();

        let reader_stream = stream.try_clone()?;
        let closer_stream = stream.try_clone()?;
        let writer = FrameWriter::with_config_net(stream, frame_config.clone())?;
        let receiver = FrameReceiver::with_config(reader_stream, frame_config);

        info!(peer = ?receiver.get_ref().peer_addr(), "link established");

        Ok(Self {
            receiver,
            sender: LinkSender {
                inner: Arc::new(Mutex::new(writer)),
            },
            closer: LinkCloser {
                stream: Arc::new(closer_stream),
            },
        })
    }

    /// Block until at least one complete frame arrives; returns all complete frames.
    pub fn receive(&mut self) -> Result<Vec<Frame>> {
        Ok(self.receiver.receive()?)
    }

    /// Block until the next frame arrives.
    pub fn read_frame(&mut self) -> Result<Frame> {
        Ok(self.receiver.read_frame()?)
    }

    /// A handle for sending from any thread.
    pub fn sender(&self) -> LinkSender {
        self.sender.clone()
    }

    /// A handle that closes this link from any thread.
    pub fn closer(&self) -> LinkCloser {
        self.closer.clone()
    }

    pub fn send(&self, command: Command, payload: &[u8]) -> Result<()> {
        self.sender.send(command, payload)
    }

    pub fn send_controller(
        &self,
        command: Command,
        controller: Controller,
        address: u16,
        length: u16,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.sender
            .send_controller(command, controller, address, length, data)
    }

    /// Bytes received but not yet returned as frames.
    pub fn buffered(&self) -> usize {
        self.receiver.buffered()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.receiver.get_ref().peer_addr()
    }

    /// Shut the connection down. A blocked [`receive`](Self::receive) returns an error.
    pub fn close(&self) -> Result<()> {
        self.closer.close()
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("stream", self.receiver.get_ref())
            .field("buffer", self.receiver.buffer())
            .finish()
    }
}

/// Cloneable sending half of a [`Link`].
#[derive(Clone)]
pub struct LinkSender {
    inner: Arc<Mutex<FrameWriter<NetStream>>>,
}

impl LinkSender {
    fn with_writer<T>(
        &self,
        f: impl FnOnce(&mut FrameWriter<NetStream>) -> scopelink_frame::Result<T>,
    ) -> Result<T> {
        let mut writer = self.inner.lock().map_err(|_| LinkError::Poisoned)?;
        Ok(f(&mut *writer)?)
    }

    pub fn send(&self, command: Command, payload: &[u8]) -> Result<()> {
        self.with_writer(|writer| writer.send(command, payload))
    }

    pub fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.with_writer(|writer| writer.write_frame(frame))
    }

    /// Send a controller register access; see [`scopelink_frame::encode_controller`].
    pub fn send_controller(
        &self,
        command: Command,
        controller: Controller,
        address: u16,
        length: u16,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.with_writer(|writer| {
            writer.send_controller(command, controller, address, length, data)
        })
    }

    pub fn send_access(&self, command: Command, access: &ControllerAccess) -> Result<()> {
        self.with_writer(|writer| writer.send_access(command, access))
    }
}

/// Closes a [`Link`] out of band.
#[derive(Clone)]
pub struct LinkCloser {
    stream: Arc<NetStream>,
}

impl LinkCloser {
    pub fn close(&self) -> Result<()> {
        debug!("closing link");
        self.stream.shutdown()?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::thread;
    use std::time::Duration;

    use scopelink_frame::{decode_controller, decode_frame, FrameError};

    use super::*;

    fn fast_config() -> LinkConfig {
        LinkConfig {
            poll_interval_ms: 20,
            ..LinkConfig::default()
        }
    }

    #[test]
    fn send_reaches_peer() {
        let (local, mut remote) = NetStream::pair().unwrap();
        let link = Link::from_stream(local, &fast_config()).unwrap();

        link.send(Command::Set, &[0x01, 0x02, 0x03]).unwrap();

        let mut buf = [0u8; 8];
        remote.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x08, 0x00, 0x00, 0x00, 0x19, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn receive_batches_frames() {
        let (local, mut remote) = NetStream::pair().unwrap();
        let mut link = Link::from_stream(local, &fast_config()).unwrap();

        remote
            .write_all(&[
                0x08, 0x00, 0x00, 0x00, 0x19, 0x01, 0x02, 0x03, 0x05, 0x00, 0x00, 0x00, 0x0e,
            ])
            .unwrap();

        let mut frames = Vec::new();
        while frames.len() < 2 {
            frames.extend(link.receive().unwrap());
        }
        assert_eq!(frames[0].command, Command::Set);
        assert_eq!(frames[1].command, Command::Flush);
        assert_eq!(link.buffered(), 0);
    }

    #[test]
    fn sender_works_while_receive_blocks() {
        let (local, mut remote) = NetStream::pair().unwrap();
        let mut link = Link::from_stream(local, &fast_config()).unwrap();
        let sender = link.sender();

        let receiver = thread::spawn(move || link.read_frame());

        sender
            .send_controller(Command::Get, Controller::Fpga, 0x10, 4, None)
            .unwrap();

        let mut request = [0u8; 10];
        remote.read_exact(&mut request).unwrap();
        let frame = decode_frame(&request).unwrap();
        let access = decode_controller(&frame.payload).unwrap();
        assert_eq!(access, ControllerAccess::read(Controller::Fpga, 0x10, 4));

        let reply = bytes_of(Command::Get, &[0x03, 0x10, 0x00, 0x04, 0x00, 1, 2, 3, 4]);
        remote.write_all(&reply).unwrap();

        let answer = receiver.join().unwrap().unwrap();
        let access = decode_controller(&answer.payload).unwrap();
        assert_eq!(access.data.as_deref(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn close_unblocks_receive() {
        let (local, _remote) = NetStream::pair().unwrap();
        let mut link = Link::from_stream(local, &fast_config()).unwrap();
        let closer = link.closer();

        let receiver = thread::spawn(move || link.receive());
        thread::sleep(Duration::from_millis(50));
        closer.close().unwrap();

        let err = receiver.join().unwrap().unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[test]
    fn peer_close_is_connection_loss() {
        let (local, remote) = NetStream::pair().unwrap();
        let mut link = Link::from_stream(local, &fast_config()).unwrap();
        drop(remote);

        let err = link.receive().unwrap_err();
        assert!(matches!(
            err,
            LinkError::Frame(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let (local, _remote) = NetStream::pair().unwrap();
        let config = LinkConfig {
            poll_interval_ms: 0,
            ..LinkConfig::default()
        };
        let err = Link::from_stream(local, &config).unwrap_err();
        assert!(matches!(err, LinkError::ConfigValue { .. }));
    }

    fn bytes_of(command: Command, payload: &[u8]) -> Vec<u8> {
        Frame::new(command, payload.to_vec())
            .to_bytes()
            .unwrap()
            .to_vec()
    }
}
