use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A byte stream that can wait for read readiness with a bounded timeout.
///
/// `poll_readable` returns `Ok(false)` when nothing arrived within `timeout`
/// and `Ok(true)` when the next `read` will not block (including when the
/// peer hung up, in which case that read returns 0 or an error).
pub trait Connection: Read + Write {
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool>;
}

impl Connection for TcpStream {
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            crate::poll::poll_fd_readable(self.as_raw_fd(), timeout)
        }
        #[cfg(not(unix))]
        {
            crate::poll::peek_readable(self, timeout)
        }
    }
}

#[cfg(unix)]
impl Connection for std::os::unix::net::UnixStream {
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        use std::os::fd::AsRawFd;
        crate::poll::poll_fd_readable(self.as_raw_fd(), timeout)
    }
}

/// A connected device stream: implements `Read + Write + Connection`.
///
/// Wraps a TCP stream for real devices. On Unix a connected socket pair is
/// also available for in-process simulators and tests.
pub struct NetStream {
    inner: NetStreamInner,
}

enum NetStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            NetStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            NetStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            NetStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl Connection for NetStream {
    fn poll_readable(&self, timeout: Duration) -> io::Result<bool> {
        match &self.inner {
            NetStreamInner::Tcp(stream) => stream.poll_readable(timeout),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => stream.poll_readable(timeout),
        }
    }
}

impl From<TcpStream> for NetStream {
    fn from(stream: TcpStream) -> Self {
        Self::from_tcp(stream)
    }
}

impl NetStream {
    /// Wrap a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: NetStreamInner::Tcp(stream),
        }
    }

    /// Create a connected pair of in-process streams.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((
            Self {
                inner: NetStreamInner::Unix(left),
            },
            Self {
                inner: NetStreamInner::Unix(right),
            },
        ))
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            NetStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Disable Nagle's algorithm (TCP only; a no-op for socket pairs).
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        match &self.inner {
            NetStreamInner::Tcp(stream) => stream.set_nodelay(nodelay).map_err(Into::into),
            #[cfg(unix)]
            NetStreamInner::Unix(_) => Ok(()),
        }
    }

    /// Try to clone this stream (creates a new descriptor for the same socket).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            NetStreamInner::Tcp(stream) => NetStreamInner::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => NetStreamInner::Unix(stream.try_clone()?),
        };
        Ok(Self { inner })
    }

    /// Shut down both directions of the socket.
    ///
    /// Any clone blocked in `poll_readable` or `read` wakes up and observes
    /// end-of-stream.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            NetStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            NetStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other.map_err(Into::into),
        }
    }

    /// Remote address, for TCP streams.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            NetStreamInner::Tcp(stream) => stream.peer_addr().ok(),
            #[cfg(unix)]
            NetStreamInner::Unix(_) => None,
        }
    }
}

impl std::fmt::Debug for NetStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NetStreamInner::Tcp(stream) => f
                .debug_struct("NetStream")
                .field("type", &"tcp")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            #[cfg(unix)]
            NetStreamInner::Unix(_) => f.debug_struct("NetStream").field("type", &"unix").finish(),
        }
    }
}
