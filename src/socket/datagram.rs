use std::os::fd::{AsRawFd, OwnedFd};
use crate::addr::SockAddr;
use super::Channel;
use super::io;
use super::options::set_nonblocking_fd;

/// A UDP socket with a fixed default peer.
///
/// Created by `RawSocket::<Datagram>::connect()`. Datagrams from anyone
/// else are filtered by the kernel. A packet the peer host refused shows up
/// as `ECONNREFUSED` on a later `send`/`recv`.
pub struct ConnectedDatagram {
	fd: OwnedFd,
}

impl ConnectedDatagram {
	pub(crate) fn from_fd(fd: OwnedFd) -> Self {
		Self { fd }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// Sends `buf` as one datagram.
	pub fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		io::send(self.as_raw_fd(), buf)
	}

	/// Receives one datagram; whatever does not fit in `buf` is dropped.
	pub fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		io::recv(self.as_raw_fd(), buf)
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
		set_nonblocking_fd(self.as_raw_fd(), nonblocking)
	}

	/// The local address the kernel picked at connect time.
	pub fn local_addr(&self) -> std::io::Result<SockAddr> {
		io::local_addr(self.as_raw_fd())
	}

	pub fn peer_addr(&self) -> std::io::Result<SockAddr> {
		io::peer_addr(self.as_raw_fd())
	}
}

impl Channel for ConnectedDatagram {
	fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		ConnectedDatagram::send(self, buf)
	}

	fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		ConnectedDatagram::recv(self, buf)
	}
}

impl std::fmt::Debug for ConnectedDatagram {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConnectedDatagram").field("fd", &self.as_raw_fd()).finish()
	}
}

impl std::os::fd::AsRawFd for ConnectedDatagram {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}

impl std::os::fd::AsFd for ConnectedDatagram {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		std::os::fd::AsFd::as_fd(&self.fd)
	}
}
