use std::os::fd::{OwnedFd, FromRawFd, AsRawFd};
use crate::addr::{SockAddr, FromSockAddr};
use crate::error::{SocketError, errno};
use super::stream::ConnectedStream;
use super::io;
use super::options::set_nonblocking_fd;
use super::{AcceptResult, Acceptor};

/// A listening stream socket.
pub struct Listener {
    fd: OwnedFd,
}

impl Listener {
    /// Called by `BoundSocket::listen()`.
    pub(crate) fn from_fd(fd: OwnedFd) -> Self {
        Self { fd }
    }

    #[inline]
    pub fn as_raw_fd(&self) -> libc::c_int {
        self.fd.as_raw_fd()
    }

    /// Only matters for a bare blocking `accept()`; `accept_nonblocking()`
    /// never waits regardless.
    pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
        set_nonblocking_fd(self.as_raw_fd(), nonblocking)
    }

    /// Takes one queued connection, if any, **without blocking**.
    ///
    /// The peer socket comes back already non-blocking and close-on-exec.
    /// Being accepted says nothing about readability: the first `recv()`
    /// may well be `WouldBlock`.
    pub fn accept_nonblocking(&self) -> std::io::Result<AcceptResult<ConnectedStream>> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let fd = unsafe {
            libc::accept4(
                self.as_raw_fd(),
                &mut storage as *mut _ as *mut libc::sockaddr,
                &mut len,
                libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC,
            )
        };

        if fd == -1 {
            let err = errno();
            return match err {
                libc::EAGAIN => Ok(AcceptResult::WouldBlock),
                libc::EINTR => Ok(AcceptResult::Interrupted),
                // Peer reset before we got to it.
                libc::ECONNABORTED => Ok(AcceptResult::WouldBlock),
                _ => Err(SocketError::Accept { errno: err }.into()),
            };
        }

        let peer = ConnectedStream::from_fd(unsafe { OwnedFd::from_raw_fd(fd) });
        let addr = unsafe { SockAddr::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len) }
            .ok_or(SocketError::InvalidAddress { reason: "peer address truncated" })?;

        Ok(AcceptResult::Connection(peer, addr))
    }

    /// The bound address; tells you which port a `:0` bind got.
    pub fn local_addr(&self) -> std::io::Result<SockAddr> {
        io::local_addr(self.as_raw_fd())
    }
}

/*
  ┌──────────────┬──────────────────────────────────────────────┐
  │ accept4()    │ Reported as                                  │
  ├──────────────┼──────────────────────────────────────────────┤
  │ fd           │ Connection(peer, addr)                       │
  │ EAGAIN       │ WouldBlock                                   │
  │ ECONNABORTED │ WouldBlock (the queue entry is already gone) │
  │ EINTR        │ Interrupted                                  │
  │ anything else│ Err: the listener itself is in trouble       │
  └──────────────┴──────────────────────────────────────────────┘
*/

impl Acceptor for Listener {
    type Peer = ConnectedStream;

    fn accept_nonblocking(&self) -> std::io::Result<AcceptResult<ConnectedStream>> {
        Listener::accept_nonblocking(self)
    }

    fn local_addr(&self) -> std::io::Result<SockAddr> {
        Listener::local_addr(self)
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener").field("fd", &self.as_raw_fd()).finish()
    }
}

impl std::os::fd::AsRawFd for Listener {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.fd.as_raw_fd()
    }
}
