use std::time::Duration;
use crate::addr::Endpoint;
use crate::clock::{Clock, MonotonicClock};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::socket::{Net, Os};
use super::LinkState;
use super::automaton::{Automaton, DatagramConnector};

/// A connected UDP client with the same self-healing lifecycle as
/// [`StreamClient`](super::StreamClient).
///
/// There is no handshake: `open` leaves it `Connected` right away and the
/// connect timeout is ignored. Errors the kernel reports on the connected
/// socket (ICMP port unreachable and friends) drop the link like a TCP
/// reset would. An empty datagram counts as a dead peer.
pub struct DatagramClient<N: Net = Os, C: Clock = MonotonicClock> {
	link: Automaton<DatagramConnector<N>, C>,
}

impl DatagramClient {
	pub fn new(config: LinkConfig) -> Self {
		Self::with_net(Os::new(), MonotonicClock, config)
	}
}

impl<N: Net, C: Clock> DatagramClient<N, C> {
	pub fn with_net(net: N, clock: C, config: LinkConfig) -> Self {
		Self {
			link: Automaton::new(DatagramConnector(net), clock, config),
		}
	}

	pub fn open(&mut self, host: &str, port: u16) -> Result<(), LinkError> {
		self.open_endpoint(Endpoint::new(host, port))
	}

	pub fn open_endpoint(&mut self, endpoint: Endpoint) -> Result<(), LinkError> {
		self.link.open(endpoint)
	}

	/// Receives at most one datagram. Excess bytes beyond `buf` are lost.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
		self.link.read(buf)
	}

	/// Sends `data` as one datagram.
	pub fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
		self.link.write(data)
	}

	pub fn poll(&mut self) -> Result<(), LinkError> {
		self.link.maintain()
	}

	pub fn close(&mut self) {
		self.link.close();
	}

	pub fn is_connected(&self) -> bool {
		self.link.is_connected()
	}

	pub fn is_open(&self) -> bool {
		self.link.is_open()
	}

	pub fn state(&self) -> LinkState {
		self.link.state()
	}

	pub fn last_activity(&self) -> Option<Duration> {
		self.link.last_activity()
	}

	pub fn endpoint(&self) -> Option<&Endpoint> {
		self.link.endpoint()
	}

	pub fn config(&self) -> &LinkConfig {
		self.link.config()
	}
}

impl<N: Net, C: Clock> std::fmt::Debug for DatagramClient<N, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DatagramClient")
			.field("endpoint", &self.link.endpoint())
			.field("state", &self.link.state())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::ErrorKind;
	use std::sync::Arc;
	use crate::clock::ManualClock;
	use crate::config::ReconnectPolicy;
	use crate::socket::mock::{ConnectPlan, MockNet};

	fn client(config: LinkConfig) -> (DatagramClient<MockNet, Arc<ManualClock>>, MockNet, Arc<ManualClock>) {
		let net = MockNet::new();
		let clock = Arc::new(ManualClock::new());
		(DatagramClient::with_net(net.clone(), clock.clone(), config), net, clock)
	}

	#[test]
	fn open_connects_at_once() {
		let (mut client, net, _clock) = client(LinkConfig::new());
		client.open("192.168.0.10", 9000).unwrap();
		assert!(client.is_connected());

		assert_eq!(client.write(b"$GPGGA").unwrap(), 6);
		let peer = net.last_peer().unwrap();
		assert_eq!(peer.take_written(), b"$GPGGA");

		peer.push(b"ack");
		let mut buf = [0u8; 16];
		assert_eq!(client.read(&mut buf).unwrap(), 3);
	}

	#[test]
	fn refused_peer_reconnects_after_wait() {
		let config = LinkConfig::new().reconnect(ReconnectPolicy::After(Duration::from_secs(2)));
		let (mut client, net, clock) = client(config);
		client.open("192.168.0.10", 9000).unwrap();
		net.last_peer().unwrap().break_reads(ErrorKind::ConnectionRefused);

		let mut buf = [0u8; 16];
		assert_eq!(client.read(&mut buf).unwrap(), 0);
		client.read(&mut buf).unwrap();
		assert_eq!(client.state(), LinkState::Waiting);

		clock.advance_secs(2.0);
		assert_eq!(client.read(&mut buf).unwrap(), 0);
		assert_eq!(net.connect_attempts(), 2);
		net.last_peer().unwrap().push(b"x");
		assert_eq!(client.read(&mut buf).unwrap(), 1);
	}

	#[test]
	fn one_shot_datagram_stops_after_first_failure() {
		let config = LinkConfig::new().reconnect(ReconnectPolicy::Never);
		let (mut client, net, _clock) = client(config);
		client.open("192.168.0.10", 9000).unwrap();
		net.last_peer().unwrap().break_writes(ErrorKind::ConnectionRefused);

		assert_eq!(client.write(b"x").unwrap(), 0);
		assert!(client.write(b"x").unwrap_err().is_terminal());
		assert_eq!(net.connect_attempts(), 1);
	}

	#[test]
	fn refused_open_reports_resolve_error() {
		let (mut client, net, _clock) = client(LinkConfig::new());
		net.script_connect(ConnectPlan::Refuse(ErrorKind::PermissionDenied));
		assert!(matches!(client.open("192.168.0.10", 9000), Err(LinkError::Resolve { .. })));
		assert!(!client.is_open());
	}
}
