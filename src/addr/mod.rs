//! Addresses and endpoints.
//!
//! - `Endpoint`: what the caller asks for: a host and a service/port string
//! - `SockAddr`: one resolved candidate, ready for `connect()`/`bind()`
//!
//! Endpoints are resolved again on every (re)connect attempt, so a client
//! follows DNS changes without being reopened.

mod endpoint;
mod resolve;

pub use self::endpoint::Endpoint;
pub(crate) use self::resolve::resolve;

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	/// Returns None if the address is invalid.
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}
/*
A closure, not a returned pointer: sockaddr_in and sockaddr_in6 differ in
size, and the pointer is only valid while the storage it points into lives.
*/

/// Trait for address types that can be created from raw sockaddr.
pub trait FromSockAddr: Sized {
	/// Creates address from raw sockaddr storage.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes.
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self>;
}

/// A resolved socket address of any family.
///
/// Whatever `getaddrinfo()` or `accept()` hands back is kept verbatim in a
/// `sockaddr_storage`, so IPv4 and IPv6 candidates share one type.
#[derive(Clone, Copy)]
pub struct SockAddr {
	storage: libc::sockaddr_storage,
	len: libc::socklen_t,
}

impl SockAddr {
	/// Returns the address family (`AF_INET`, `AF_INET6`, ...).
	#[inline]
	pub fn family(&self) -> libc::c_int {
		self.storage.ss_family as libc::c_int
	}

	/// Converts to a std address. `None` for families other than IPv4/IPv6.
	pub fn to_std(&self) -> Option<SocketAddr> {
		match self.family() {
			libc::AF_INET if self.len as usize >= std::mem::size_of::<libc::sockaddr_in>() => {
				let raw = unsafe { &*(&self.storage as *const _ as *const libc::sockaddr_in) };
				let ip = Ipv4Addr::from(raw.sin_addr.s_addr.to_ne_bytes());
				Some(SocketAddr::V4(SocketAddrV4::new(ip, u16::from_be(raw.sin_port))))
			}
			libc::AF_INET6 if self.len as usize >= std::mem::size_of::<libc::sockaddr_in6>() => {
				let raw = unsafe { &*(&self.storage as *const _ as *const libc::sockaddr_in6) };
				let ip = Ipv6Addr::from(raw.sin6_addr.s6_addr);
				Some(SocketAddr::V6(SocketAddrV6::new(
					ip,
					u16::from_be(raw.sin6_port),
					raw.sin6_flowinfo,
					raw.sin6_scope_id,
				)))
			}
			_ => None,
		}
	}

	/// Port number, if this is an IP address.
	pub fn port(&self) -> Option<u16> {
		self.to_std().map(|addr| addr.port())
	}
}

impl From<SocketAddr> for SockAddr {
	fn from(addr: SocketAddr) -> Self {
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		let len = match addr {
			SocketAddr::V4(v4) => {
				let raw = libc::sockaddr_in {
					sin_family: libc::AF_INET as libc::sa_family_t,
					sin_port: v4.port().to_be(),
					sin_addr: libc::in_addr {
						s_addr: u32::from_ne_bytes(v4.ip().octets()),
					},
					sin_zero: [0; 8],
				};
				unsafe {
					std::ptr::write(&mut storage as *mut _ as *mut libc::sockaddr_in, raw);
				}
				std::mem::size_of::<libc::sockaddr_in>()
			}
			SocketAddr::V6(v6) => {
				let raw = libc::sockaddr_in6 {
					sin6_family: libc::AF_INET6 as libc::sa_family_t,
					sin6_port: v6.port().to_be(),
					sin6_flowinfo: v6.flowinfo(),
					sin6_addr: libc::in6_addr {
						s6_addr: v6.ip().octets(),
					},
					sin6_scope_id: v6.scope_id(),
				};
				unsafe {
					std::ptr::write(&mut storage as *mut _ as *mut libc::sockaddr_in6, raw);
				}
				std::mem::size_of::<libc::sockaddr_in6>()
			}
		};
		Self { storage, len: len as libc::socklen_t }
	}
}

impl ToSockAddr for SockAddr {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let ptr = &self.storage as *const _ as *const libc::sockaddr;
		Some(f(ptr, self.len))
	}
}

impl FromSockAddr for SockAddr {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if (len as usize) < std::mem::size_of::<libc::sa_family_t>()
			|| (len as usize) > std::mem::size_of::<libc::sockaddr_storage>()
		{
			return None;
		}
		let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
		unsafe {
			std::ptr::copy_nonoverlapping(
				addr as *const u8,
				&mut storage as *mut _ as *mut u8,
				len as usize,
			);
		}
		Some(Self { storage, len })
	}
}

impl PartialEq for SockAddr {
	fn eq(&self, other: &Self) -> bool {
		match (self.to_std(), other.to_std()) {
			(Some(a), Some(b)) => a == b,
			_ => false,
		}
	}
}

impl std::fmt::Display for SockAddr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.to_std() {
			Some(addr) => write!(f, "{}", addr),
			None => write!(f, "<family {}>", self.family()),
		}
	}
}

impl std::fmt::Debug for SockAddr {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "SockAddr({})", self)
	}
}
