use std::os::fd::{OwnedFd, AsRawFd};
use std::marker::PhantomData;
use crate::error::{SocketError, errno};
use super::{SockType, Stream};
use super::listener::Listener;

/// A socket with a local address and nothing else yet.
pub struct BoundSocket<T: SockType> {
	fd: OwnedFd,
	_marker: PhantomData<T>,
}

impl<T: SockType> BoundSocket<T> {
	pub(crate) fn from_fd(fd: OwnedFd) -> Self {
		Self { fd, _marker: PhantomData }
	}
}

impl BoundSocket<Stream> {
	/// Starts accepting. Feed servers take one peer per poll, so `backlog`
	/// can stay small.
	pub fn listen(self, backlog: i32) -> std::io::Result<Listener> {
		if unsafe { libc::listen(self.fd.as_raw_fd(), backlog) } == -1 {
			return Err(SocketError::Listen { errno: errno(), backlog }.into());
		}
		Ok(Listener::from_fd(self.fd))
	}
}

impl<T: SockType> std::os::fd::AsRawFd for BoundSocket<T> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}
