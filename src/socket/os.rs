use crate::addr::{self, Endpoint, SockAddr};
use super::{Net, SockType, Stream, Datagram, RawSocket, PendingConnect,
			ConnectedStream, ConnectedDatagram, Listener, TcpConfig, set_reuse_addr};

/// The Linux socket provider.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use feedlane::{Os, TcpConfig, KeepaliveConfig};
///
/// let keepalive = KeepaliveConfig::within(Duration::from_secs(30), 3);
/// let net = Os::new().tcp(TcpConfig::new().keepalive(keepalive));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Os {
	tcp: TcpConfig,
}

impl Os {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set TCP options for outgoing streams.
	pub fn tcp(mut self, config: TcpConfig) -> Self {
		self.tcp = config;
		self
	}
}

impl Net for Os {
	type Stream = ConnectedStream;
	type Pending = PendingConnect;
	type Datagram = ConnectedDatagram;
	type Listener = Listener;

	fn resolve<T: SockType>(&self, endpoint: &Endpoint, passive: bool) -> std::io::Result<Vec<SockAddr>> {
		addr::resolve(endpoint, T::raw(), T::protocol(), passive)
	}

	fn connect_stream(&self, addr: &SockAddr) -> std::io::Result<PendingConnect> {
		let socket = RawSocket::<Stream>::for_addr(addr)?;
		self.tcp.apply(&socket)?;
		socket.connect_nonblocking(addr)
	}

	fn connect_datagram(&self, addr: &SockAddr) -> std::io::Result<ConnectedDatagram> {
		RawSocket::<Datagram>::for_addr(addr)?.connect(addr)
	}

	fn listen(&self, addr: &SockAddr, backlog: i32) -> std::io::Result<Listener> {
		let socket = RawSocket::<Stream>::for_addr(addr)?;
		set_reuse_addr(&socket, true)?;
		socket.set_nonblocking(true)?;
		socket.bind(addr)?.listen(backlog)
	}
}
