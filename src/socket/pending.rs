use std::os::fd::{OwnedFd, AsRawFd};
use super::stream::ConnectedStream;
use super::options::get_int_option;
use super::{ConnectStatus, Pending};

/// A stream socket whose non-blocking `connect()` is in flight.
pub struct PendingConnect {
	fd: OwnedFd,
}

impl PendingConnect {
	pub(crate) fn from_fd(fd: OwnedFd) -> Self {
		Self { fd }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		self.fd.as_raw_fd()
	}

	/// Takes the pending `SO_ERROR`, if any. The kernel clears it on read.
	pub fn take_error(&self) -> std::io::Result<Option<std::io::Error>> {
		match get_int_option(self.as_raw_fd(), libc::SOL_SOCKET, libc::SO_ERROR, "SO_ERROR")? {
			0 => Ok(None),
			code => Ok(Some(std::io::Error::from_raw_os_error(code))),
		}
	}

	/// Checks writability with a zero timeout, then reads `SO_ERROR`.
	///
	/// Never waits: no event yet is `ConnectStatus::Pending`.
	pub fn poll_connect(&self) -> std::io::Result<ConnectStatus> {
		let mut pfd = libc::pollfd {
			fd: self.as_raw_fd(),
			events: libc::POLLOUT,
			revents: 0,
		};

		let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
		if ready == -1 {
			let err = std::io::Error::last_os_error();
			if err.kind() == std::io::ErrorKind::Interrupted {
				return Ok(ConnectStatus::Pending);
			}
			return Err(err);
		}
		if ready == 0 {
			return Ok(ConnectStatus::Pending);
		}

		match self.take_error()? {
			Some(err) => Ok(ConnectStatus::Failed(err)),
			None if pfd.revents & (libc::POLLERR | libc::POLLHUP) != 0 => {
				Ok(ConnectStatus::Failed(std::io::ErrorKind::NotConnected.into()))
			}
			None => Ok(ConnectStatus::Connected),
		}
	}

	/// Completes the connection. Consumes self.
	pub fn finish(self) -> ConnectedStream {
		ConnectedStream::from_fd(self.fd)
	}
}
/*
  ┌───────────────────────┬─────────────────────────────────────────────┐
  │ poll() result         │ Meaning                                     │
  ├───────────────────────┼─────────────────────────────────────────────┤
  │ 0                     │ handshake still running                     │
  ├───────────────────────┼─────────────────────────────────────────────┤
  │ POLLOUT, SO_ERROR = 0 │ connected                                   │
  ├───────────────────────┼─────────────────────────────────────────────┤
  │ SO_ERROR != 0         │ refused / unreachable / timed out by kernel │
  └───────────────────────┴─────────────────────────────────────────────┘
*/

impl Pending for PendingConnect {
	type Stream = ConnectedStream;

	fn poll_connect(&self) -> std::io::Result<ConnectStatus> {
		PendingConnect::poll_connect(self)
	}

	fn finish(self) -> ConnectedStream {
		PendingConnect::finish(self)
	}
}

impl std::os::fd::AsRawFd for PendingConnect {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		self.fd.as_raw_fd()
	}
}
