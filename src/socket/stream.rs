use std::os::fd::{AsRawFd, OwnedFd};
use crate::addr::SockAddr;
use super::Channel;
use super::io;
use super::options::set_nonblocking_fd;

/// A connected stream socket.
///
/// Created by `PendingConnect::finish()` (client) or
/// `Listener::accept_nonblocking()` (server). Non-blocking either way.
pub struct ConnectedStream {
	fd: OwnedFd,
}

impl ConnectedStream {
	pub(crate) fn from_fd(fd: OwnedFd) -> Self {
		Self { fd }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// `Ok(0)` means the peer closed.
	pub fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		io::recv(self.as_raw_fd(), buf)
	}

	pub fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		io::send(self.as_raw_fd(), buf)
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
		set_nonblocking_fd(self.as_raw_fd(), nonblocking)
	}

	pub fn local_addr(&self) -> std::io::Result<SockAddr> {
		io::local_addr(self.as_raw_fd())
	}

	pub fn peer_addr(&self) -> std::io::Result<SockAddr> {
		io::peer_addr(self.as_raw_fd())
	}
}

impl Channel for ConnectedStream {
	fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		ConnectedStream::send(self, buf)
	}

	fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		ConnectedStream::recv(self, buf)
	}
}

impl std::fmt::Debug for ConnectedStream {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectedStream").field("fd", &self.as_raw_fd()).finish()
	}
}

impl std::os::fd::AsRawFd for ConnectedStream {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for ConnectedStream {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		std::os::fd::AsFd::as_fd(&self.fd)
	}
}
