//! Syscall wrappers shared by every connected and listening socket.

use std::os::fd::RawFd;
use crate::addr::{FromSockAddr, SockAddr};
use crate::error::{IoError, SocketError, errno};

/// `recv()` with no flags. `Ok(0)` is end-of-stream for TCP and an empty
/// datagram for UDP.
pub(crate) fn recv(fd: RawFd, buf: &mut [u8]) -> std::io::Result<usize> {
	let n = unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
	if n == -1 {
		return Err(IoError::Read { errno: errno() }.into());
	}
	Ok(n as usize)
}

/// `send()` with `MSG_NOSIGNAL`: a vanished peer is `EPIPE`, never SIGPIPE.
pub(crate) fn send(fd: RawFd, buf: &[u8]) -> std::io::Result<usize> {
	let n = unsafe { libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), libc::MSG_NOSIGNAL) };
	if n == -1 {
		return Err(IoError::Write { errno: errno() }.into());
	}
	Ok(n as usize)
}

type NameFn = unsafe extern "C" fn(libc::c_int, *mut libc::sockaddr, *mut libc::socklen_t) -> libc::c_int;

fn sock_name(fd: RawFd, call: NameFn, option: &'static str) -> std::io::Result<SockAddr> {
	let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
	let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

	if unsafe { call(fd, &mut storage as *mut _ as *mut libc::sockaddr, &mut len) } == -1 {
		return Err(SocketError::GetOption { errno: errno(), option }.into());
	}
	unsafe { SockAddr::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len) }
		.ok_or_else(|| SocketError::InvalidAddress { reason: "kernel returned a truncated address" }.into())
}

pub(crate) fn local_addr(fd: RawFd) -> std::io::Result<SockAddr> {
	sock_name(fd, libc::getsockname, "getsockname")
}

pub(crate) fn peer_addr(fd: RawFd) -> std::io::Result<SockAddr> {
	sock_name(fd, libc::getpeername, "getpeername")
}
