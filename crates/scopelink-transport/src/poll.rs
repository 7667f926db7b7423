//! Bounded readiness waits on raw sockets.

use std::io;
use std::time::Duration;

/// Wait up to `timeout` for `fd` to become readable.
///
/// Hang-up and error conditions count as readable so the caller's next
/// `read` observes the failure instead of polling forever.
#[cfg(unix)]
pub fn poll_fd_readable(fd: std::os::fd::RawFd, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

    // SAFETY: `pfd` is a single valid, writable pollfd and nfds is 1.
    let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    if rc == 0 {
        return Ok(false);
    }
    if pfd.revents & libc::POLLNVAL != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "poll on a closed descriptor",
        ));
    }

    Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
}

/// Wait up to `timeout` for a TCP stream to become readable using a timed peek.
#[cfg(not(unix))]
pub fn peek_readable(stream: &std::net::TcpStream, timeout: Duration) -> io::Result<bool> {
    let timeout = timeout.max(Duration::from_millis(1));
    let previous = stream.read_timeout()?;
    stream.set_read_timeout(Some(timeout))?;

    let mut probe = [0u8; 1];
    let ready = match stream.peek(&mut probe) {
        Ok(_) => Ok(true),
        Err(err)
            if err.kind() == io::ErrorKind::WouldBlock || err.kind() == io::ErrorKind::TimedOut =>
        {
            Ok(false)
        }
        Err(err) => Err(err),
    };

    stream.set_read_timeout(previous)?;
    ready
}
