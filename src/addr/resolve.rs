use std::ffi::{CStr, CString};
use crate::addr::{Endpoint, FromSockAddr, SockAddr};
use crate::error::SocketError;

/// Resolves an endpoint with `getaddrinfo()`.
///
/// Returns every candidate in the order the resolver ranked them.
/// `passive` requests wildcard addresses for binding; an empty host then
/// means "all interfaces".
pub(crate) fn resolve(
	endpoint: &Endpoint,
	socktype: libc::c_int,
	protocol: libc::c_int,
	passive: bool,
) -> std::io::Result<Vec<SockAddr>> {
	let invalid = |reason: &str| -> std::io::Error {
		SocketError::Resolve { endpoint: endpoint.to_string(), reason: reason.into() }.into()
	};

	let host = if endpoint.host().is_empty() && passive {
		None
	} else {
		Some(CString::new(endpoint.host()).map_err(|_| invalid("host contains NUL"))?)
	};
	let service = CString::new(endpoint.service()).map_err(|_| invalid("service contains NUL"))?;

	let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
	hints.ai_family = libc::AF_UNSPEC;
	hints.ai_socktype = socktype;
	hints.ai_protocol = protocol;
	if passive {
		hints.ai_flags = libc::AI_PASSIVE;
	}

	let mut list: *mut libc::addrinfo = std::ptr::null_mut();
	let rv = unsafe {
		libc::getaddrinfo(
			host.as_ref().map_or(std::ptr::null(), |h| h.as_ptr()),
			service.as_ptr(),
			&hints,
			&mut list,
		)
	};
	if rv != 0 {
		let reason = unsafe { CStr::from_ptr(libc::gai_strerror(rv)) };
		return Err(invalid(&reason.to_string_lossy()));
	}

	let mut out = Vec::new();
	let mut cursor = list;
	while !cursor.is_null() {
		let info = unsafe { &*cursor };
		if let Some(addr) = unsafe { SockAddr::from_sockaddr(info.ai_addr, info.ai_addrlen) } {
			out.push(addr);
		}
		cursor = info.ai_next;
	}
	unsafe { libc::freeaddrinfo(list) };

	if out.is_empty() {
		return Err(invalid("no usable address"));
	}
	Ok(out)
}
/*
freeaddrinfo() runs before any early return that could follow a successful
getaddrinfo(): the loop above cannot fail, it only skips odd entries.
*/
