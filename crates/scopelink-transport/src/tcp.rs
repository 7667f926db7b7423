use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::NetStream;

/// TCP transport.
///
/// Devices (and device simulators) listen; hosts connect. Both ends end up
/// with a [`NetStream`].
pub struct TcpTransport {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpTransport {
    /// Bind and listen on a TCP address. Port 0 picks an ephemeral port.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let candidates: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
        let listener = TcpListener::bind(&candidates[..]).map_err(|e| TransportError::Bind {
            addr: candidates
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            source: e,
        })?;
        let addr = listener.local_addr()?;

        info!(%addr, "listening on tcp");

        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<NetStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(NetStream::from_tcp(stream))
    }

    /// Connect to a listening device (blocking).
    ///
    /// Every resolved address is tried in order; the error of the last
    /// attempt is returned when none succeeds. `timeout` bounds each attempt.
    pub fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<NetStream> {
        let mut last_err = None;

        for candidate in addr.to_socket_addrs()? {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    debug!(addr = %candidate, "connected over tcp");
                    return Ok(NetStream::from_tcp(stream));
                }
                Err(err) => {
                    debug!(addr = %candidate, error = %err, "tcp connect attempt failed");
                    last_err = Some(TransportError::connect(candidate, err));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            ))
        }))
    }

    /// The address this transport is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}
