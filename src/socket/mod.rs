//! Socket primitives.
//!
//! The connection layer never calls the OS directly. It talks to a [`Net`]
//! provider, which hands out non-blocking handles:
//!
//! - [`Os`]: `libc` sockets on Linux
//! - [`mock::MockNet`]: scripted in-memory handles for tests
//!
//! Every handle owns its descriptor and closes it on drop.

mod listener;
mod raw;
mod stream;
mod datagram;
mod options;
mod bound;
mod tuning;
mod io;
mod pending;
mod os;
pub mod mock;

use std::sync::atomic::{AtomicBool, Ordering};
use crate::addr::{Endpoint, SockAddr};

pub use self::listener::Listener;
pub use self::raw::RawSocket;
pub use self::stream::ConnectedStream;
pub use self::bound::BoundSocket;
pub use self::datagram::ConnectedDatagram;
pub use self::pending::PendingConnect;
pub use self::tuning::{TcpConfig, KeepaliveConfig};
pub use self::os::Os;
pub use self::options::{set_reuse_addr, set_tcp_nodelay, set_keepalive,
						set_keepalive_idle, set_keepalive_interval, set_keepalive_count};

/// Trait for socket type markers.
///
/// - `Stream`: TCP
/// - `Datagram`: UDP
pub trait SockType {
	/// Returns the libc constant for this socket type.
	fn raw() -> libc::c_int;

	/// Returns the IP protocol used with this socket type.
	fn protocol() -> libc::c_int;
}

/// Stream socket marker.
pub struct Stream;

/// Datagram socket marker.
pub struct Datagram;

impl SockType for Stream {
	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_STREAM
	}

	#[inline]
	fn protocol() -> libc::c_int {
		libc::IPPROTO_TCP
	}
}

impl SockType for Datagram {
	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_DGRAM
	}

	#[inline]
	fn protocol() -> libc::c_int {
		libc::IPPROTO_UDP
	}
}

/// A connected, non-blocking byte channel.
///
/// `WouldBlock` comes back as an `Err` with `ErrorKind::WouldBlock`.
/// For streams, `recv` returning `Ok(0)` means the peer closed.
pub trait Channel {
	fn send(&self, buf: &[u8]) -> std::io::Result<usize>;

	fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Outcome of polling a connect that is in flight.
#[derive(Debug)]
pub enum ConnectStatus {
	/// No completion event yet.
	Pending,

	/// The handshake finished; call `finish()`.
	Connected,

	/// The connect failed, with the kernel's reason.
	Failed(std::io::Error),
}

/// A stream connect that has been started but may not have completed.
pub trait Pending {
	type Stream: Channel;

	/// Checks for completion without waiting.
	fn poll_connect(&self) -> std::io::Result<ConnectStatus>;

	/// Turns a completed connect into a usable stream.
	fn finish(self) -> Self::Stream;
}

/// Result of a non-blocking accept attempt.
///
/// This enum does **not** represent listener state.
/// It represents the **outcome of a syscall probe**.
pub enum AcceptResult<S> {
	/// A connection was accepted. It may not be readable yet.
	Connection(S, SockAddr),

	/// No connection is ready at this time. Not an error.
	WouldBlock,

	/// The accept syscall was interrupted by a signal.
	Interrupted,
}

/// A passive socket handing out peers.
pub trait Acceptor {
	type Peer: Channel;

	fn accept_nonblocking(&self) -> std::io::Result<AcceptResult<Self::Peer>>;

	fn local_addr(&self) -> std::io::Result<SockAddr>;
}

/// The socket primitive provider.
///
/// Everything the connection layer needs from the platform: resolution,
/// non-blocking connect, listen and the handle types those produce.
pub trait Net {
	type Stream: Channel;
	type Pending: Pending<Stream = Self::Stream>;
	type Datagram: Channel;
	type Listener: Acceptor<Peer = Self::Stream>;

	/// Resolves an endpoint into candidate addresses for socket type `T`.
	fn resolve<T: SockType>(&self, endpoint: &Endpoint, passive: bool) -> std::io::Result<Vec<SockAddr>>;

	/// Opens a non-blocking stream socket and starts connecting it.
	fn connect_stream(&self, addr: &SockAddr) -> std::io::Result<Self::Pending>;

	/// Opens a non-blocking datagram socket with `addr` as its default peer.
	fn connect_datagram(&self, addr: &SockAddr) -> std::io::Result<Self::Datagram>;

	/// Opens a non-blocking listener bound to `addr`.
	fn listen(&self, addr: &SockAddr, backlog: i32) -> std::io::Result<Self::Listener>;
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Process-wide socket library setup.
///
/// Call once at startup, before opening anything. Idempotent. Linux needs no
/// setup, so this only records that the host application did its part; the
/// connection layer never calls it on its own.
pub fn init() -> std::io::Result<()> {
	if !INITIALIZED.swap(true, Ordering::AcqRel) {
		log::debug!("[socket] library initialized");
	}
	Ok(())
}

/// Process-wide socket library teardown. Idempotent.
pub fn cleanup() {
	if INITIALIZED.swap(false, Ordering::AcqRel) {
		log::debug!("[socket] library cleaned up");
	}
}

/// Whether [`init`] has been called without a matching [`cleanup`].
pub fn is_initialized() -> bool {
	INITIALIZED.load(Ordering::Acquire)
}

/// True for the "no progress, try later" errors of a non-blocking socket.
#[inline]
pub(crate) fn is_transient(err: &std::io::Error) -> bool {
	matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted)
}
