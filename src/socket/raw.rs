use std::os::fd::{OwnedFd, FromRawFd, AsRawFd};
use std::marker::PhantomData;
use crate::addr::{SockAddr, ToSockAddr};
use crate::error::{SocketError, errno};
use super::{SockType, Stream, Datagram};
use super::bound::BoundSocket;
use super::pending::PendingConnect;
use super::datagram::ConnectedDatagram;
use super::options::set_nonblocking_fd;

/// A freshly created socket: not bound, not connected.
///
/// The family is whatever the resolved candidate needs, so it is picked at
/// runtime; the protocol is fixed by `T`.
pub struct RawSocket<T: SockType> {
	fd: OwnedFd,
	_marker: PhantomData<T>,
}

/// Runs `bind()` or `connect()` against `addr`, yielding the errno on failure.
fn addr_call(
	fd: libc::c_int,
	addr: &SockAddr,
	call: unsafe extern "C" fn(libc::c_int, *const libc::sockaddr, libc::socklen_t) -> libc::c_int,
) -> std::io::Result<Result<(), i32>> {
	match addr.with_raw(|ptr, len| unsafe { call(fd, ptr, len) }) {
		Some(-1) => Ok(Err(errno())),
		Some(_) => Ok(Ok(())),
		None => Err(SocketError::InvalidAddress { reason: "address too long" }.into()),
	}
}

impl<T: SockType> RawSocket<T> {
	/// Opens a close-on-exec socket in `family`.
	pub fn new(family: libc::c_int) -> std::io::Result<Self> {
		let fd = unsafe { libc::socket(family, T::raw() | libc::SOCK_CLOEXEC, T::protocol()) };
		if fd == -1 {
			return Err(SocketError::Create { errno: errno() }.into());
		}
		Ok(Self { fd: unsafe { OwnedFd::from_raw_fd(fd) }, _marker: PhantomData })
	}

	/// Opens a socket whose family fits `addr`.
	pub fn for_addr(addr: &SockAddr) -> std::io::Result<Self> {
		Self::new(addr.family())
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
		set_nonblocking_fd(self.as_raw_fd(), nonblocking)
	}

	pub fn bind(self, addr: &SockAddr) -> std::io::Result<BoundSocket<T>> {
		addr_call(self.as_raw_fd(), addr, libc::bind)?
			.map_err(|errno| SocketError::Bind { errno, addr: addr.to_string() })?;
		Ok(BoundSocket::from_fd(self.fd))
	}
}

impl RawSocket<Stream> {
	/// Switches to non-blocking mode and fires off `connect()`.
	///
	/// `EINPROGRESS` is the normal outcome; the handshake is then driven by
	/// polling the returned `PendingConnect`. Loopback targets may complete
	/// at once, which looks the same to the caller.
	pub fn connect_nonblocking(self, addr: &SockAddr) -> std::io::Result<PendingConnect> {
		self.set_nonblocking(true)?;
		match addr_call(self.as_raw_fd(), addr, libc::connect)? {
			Ok(()) | Err(libc::EINPROGRESS) => Ok(PendingConnect::from_fd(self.fd)),
			Err(errno) => Err(SocketError::Connect { errno, addr: addr.to_string() }.into()),
		}
	}
}

impl RawSocket<Datagram> {
	/// Fixes the default peer. No packet goes out, so there is nothing to wait for.
	pub fn connect(self, addr: &SockAddr) -> std::io::Result<ConnectedDatagram> {
		self.set_nonblocking(true)?;
		addr_call(self.as_raw_fd(), addr, libc::connect)?
			.map_err(|errno| SocketError::Connect { errno, addr: addr.to_string() })?;
		Ok(ConnectedDatagram::from_fd(self.fd))
	}
}

impl<T: SockType> std::os::fd::AsRawFd for RawSocket<T> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}
