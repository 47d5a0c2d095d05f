use std::time::Duration;
use crate::addr::Endpoint;
use crate::clock::{Clock, MonotonicClock};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::socket::{Net, Os};
use super::LinkState;
use super::automaton::{Automaton, StreamConnector};

/// A TCP client that reconnects by itself.
///
/// All work happens inside `read` and `write`. Neither blocks. `Ok(0)`
/// means "nothing right now", whether the link is mid-reconnect or simply
/// idle. `Err` is reserved for misuse, a failed reconnect attempt, or a
/// one-shot link that has died.
///
/// # Example
/// ```ignore
/// use feedlane::{LinkConfig, StreamClient};
///
/// let mut client = StreamClient::new(LinkConfig::from_secs(10.0, 30.0, 1.0));
/// client.open("caster.example.net", 2101)?;
/// let mut buf = [0u8; 4096];
/// loop {
///     let n = client.read(&mut buf)?;
///     // ...
/// }
/// ```
pub struct StreamClient<N: Net = Os, C: Clock = MonotonicClock> {
	link: Automaton<StreamConnector<N>, C>,
}

impl StreamClient {
	/// A client on real sockets and the system clock.
	pub fn new(config: LinkConfig) -> Self {
		Self::with_net(Os::new(), MonotonicClock, config)
	}
}

impl<N: Net, C: Clock> StreamClient<N, C> {
	pub fn with_net(net: N, clock: C, config: LinkConfig) -> Self {
		Self {
			link: Automaton::new(StreamConnector(net), clock, config),
		}
	}

	/// Resolves `host:port` and starts connecting.
	///
	/// Returns as soon as a connect is in flight; completion is observed by
	/// later calls. Fails with [`LinkError::Busy`] while a socket is held.
	pub fn open(&mut self, host: &str, port: u16) -> Result<(), LinkError> {
		self.open_endpoint(Endpoint::new(host, port))
	}

	/// Like [`open`](Self::open) but takes a named service too.
	pub fn open_endpoint(&mut self, endpoint: Endpoint) -> Result<(), LinkError> {
		self.link.open(endpoint)
	}

	/// Advances the link, then reads what is available.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
		self.link.read(buf)
	}

	/// Advances the link, then writes what the socket takes. May be partial.
	pub fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
		self.link.write(data)
	}

	/// Runs one maintenance step without any I/O.
	pub fn poll(&mut self) -> Result<(), LinkError> {
		self.link.maintain()
	}

	/// Releases the socket and forgets the endpoint. Safe to repeat.
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

	/// Time since the last byte moved or the last state change.
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

impl<N: Net, C: Clock> std::fmt::Debug for StreamClient<N, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StreamClient")
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

	type Client = StreamClient<MockNet, Arc<ManualClock>>;

	fn client(config: LinkConfig) -> (Client, MockNet, Arc<ManualClock>) {
		let net = MockNet::new();
		let clock = Arc::new(ManualClock::new());
		(StreamClient::with_net(net.clone(), clock.clone(), config), net, clock)
	}

	fn retry_after_one_sec() -> LinkConfig {
		LinkConfig::new()
			.connect_timeout(Duration::from_secs(10))
			.reconnect(ReconnectPolicy::After(Duration::from_secs(1)))
	}

	#[test]
	fn connect_completes_on_next_poll() {
		let (mut client, net, _clock) = client(retry_after_one_sec());
		client.open("10.1.1.1", 2101).unwrap();
		assert_eq!(client.state(), LinkState::Connecting);

		let mut buf = [0u8; 16];
		assert_eq!(client.read(&mut buf).unwrap(), 0);
		assert!(client.is_connected());

		net.last_peer().unwrap().push(b"rtcm");
		assert_eq!(client.read(&mut buf).unwrap(), 4);
		assert_eq!(&buf[..4], b"rtcm");
	}

	#[test]
	fn unopened_client_reports_not_open() {
		let (mut client, net, _clock) = client(LinkConfig::new());
		assert!(matches!(client.read(&mut [0u8; 4]), Err(LinkError::NotOpen)));
		assert!(matches!(client.write(b"x"), Err(LinkError::NotOpen)));
		assert_eq!(net.connect_attempts(), 0);
	}

	#[test]
	fn second_open_is_busy() {
		let (mut client, _net, _clock) = client(LinkConfig::new());
		client.open("10.1.1.1", 2101).unwrap();
		assert!(matches!(client.open("10.1.1.2", 2101), Err(LinkError::Busy)));
	}

	#[test]
	fn unresolvable_host_fails_open() {
		let (mut client, net, _clock) = client(LinkConfig::new());
		net.fail_resolve(true);
		assert!(matches!(client.open("nowhere.invalid", 2101), Err(LinkError::Resolve { .. })));
		assert!(!client.is_open());
		assert_eq!(client.state(), LinkState::Error);
	}

	#[test]
	fn every_candidate_is_tried() {
		let (mut client, net, _clock) = client(LinkConfig::new());
		net.set_candidates(3);
		net.script_connect(ConnectPlan::Refuse(ErrorKind::ConnectionRefused));
		net.script_connect(ConnectPlan::Refuse(ErrorKind::ConnectionRefused));
		client.open("10.1.1.1", 2101).unwrap();
		assert_eq!(net.connect_attempts(), 3);
		assert_eq!(client.state(), LinkState::Connecting);
	}

	#[test]
	fn hung_connect_times_out_and_retries() {
		let (mut client, net, clock) = client(retry_after_one_sec());
		net.script_connect(ConnectPlan::Hang);
		client.open("10.1.1.1", 2101).unwrap();
		let first = net.last_peer().unwrap();

		let mut buf = [0u8; 8];
		clock.advance_secs(5.0);
		assert_eq!(client.read(&mut buf).unwrap(), 0);
		assert_eq!(client.state(), LinkState::Connecting);

		clock.advance_secs(6.0);
		assert_eq!(client.read(&mut buf).unwrap(), 0);
		assert_eq!(client.state(), LinkState::Waiting);
		assert!(first.is_dropped());

		clock.advance_secs(0.5);
		client.read(&mut buf).unwrap();
		assert_eq!(net.connect_attempts(), 1);

		clock.advance_secs(0.5);
		client.read(&mut buf).unwrap();
		assert_eq!(net.connect_attempts(), 2);
		client.read(&mut buf).unwrap();
		assert!(client.is_connected());
	}

	#[test]
	fn peer_close_drops_then_reconnects() {
		let (mut client, net, clock) = client(retry_after_one_sec());
		client.open("10.1.1.1", 2101).unwrap();
		let mut buf = [0u8; 8];
		client.read(&mut buf).unwrap();

		let peer = net.last_peer().unwrap();
		peer.close();
		assert_eq!(client.read(&mut buf).unwrap(), 0);
		assert_eq!(client.state(), LinkState::Error);
		assert!(peer.is_dropped());

		client.read(&mut buf).unwrap();
		assert_eq!(client.state(), LinkState::Waiting);

		clock.advance_secs(1.0);
		client.read(&mut buf).unwrap();
		client.read(&mut buf).unwrap();
		assert!(client.is_connected());
		assert_eq!(net.connect_attempts(), 2);
	}

	#[test]
	fn one_shot_failure_is_terminal() {
		let config = LinkConfig::new().reconnect(ReconnectPolicy::Never);
		let (mut client, net, clock) = client(config);
		net.script_connect(ConnectPlan::FailLater(ErrorKind::ConnectionRefused));
		client.open("10.1.1.1", 2101).unwrap();

		let mut buf = [0u8; 8];
		let err = client.read(&mut buf).unwrap_err();
		assert!(err.is_terminal());

		clock.advance_secs(60.0);
		assert!(matches!(client.read(&mut buf), Err(LinkError::Terminal { .. })));
		assert!(matches!(client.write(b"gga"), Err(LinkError::Terminal { .. })));
		assert_eq!(net.connect_attempts(), 1);
	}

	#[test]
	fn failed_reconnect_is_reported_and_retried() {
		let (mut client, net, clock) = client(retry_after_one_sec());
		client.open("10.1.1.1", 2101).unwrap();
		let mut buf = [0u8; 8];
		client.read(&mut buf).unwrap();

		net.last_peer().unwrap().break_reads(ErrorKind::ConnectionReset);
		client.read(&mut buf).unwrap();
		client.read(&mut buf).unwrap();
		assert_eq!(client.state(), LinkState::Waiting);

		net.script_connect(ConnectPlan::Refuse(ErrorKind::ConnectionRefused));
		clock.advance_secs(1.0);
		let err = client.read(&mut buf).unwrap_err();
		assert!(matches!(err, LinkError::Reconnect { .. }));
		assert!(!err.is_terminal());
		assert_eq!(client.state(), LinkState::Waiting);

		assert_eq!(client.read(&mut buf).unwrap(), 0);
		assert_eq!(client.state(), LinkState::Connecting);
		assert_eq!(net.connect_attempts(), 3);
	}

	#[test]
	fn silent_link_is_dropped() {
		let config = retry_after_one_sec().inactive_timeout(Duration::from_secs(5));
		let (mut client, net, clock) = client(config);
		client.open("10.1.1.1", 2101).unwrap();
		let mut buf = [0u8; 8];
		client.read(&mut buf).unwrap();
		let peer = net.last_peer().unwrap();

		clock.advance_secs(3.0);
		peer.push(b"x");
		assert_eq!(client.read(&mut buf).unwrap(), 1);

		clock.advance_secs(3.0);
		client.read(&mut buf).unwrap();
		assert!(client.is_connected());

		clock.advance_secs(2.0);
		client.read(&mut buf).unwrap();
		assert_eq!(client.state(), LinkState::Waiting);
		assert!(peer.is_dropped());
	}

	#[test]
	fn writes_may_be_partial_and_refresh_activity() {
		let (mut client, net, clock) = client(LinkConfig::new());
		client.open("10.1.1.1", 2101).unwrap();
		client.poll().unwrap();
		let peer = net.last_peer().unwrap();

		clock.advance_secs(4.0);
		peer.limit_writes(Some(2));
		assert_eq!(client.write(b"abcd").unwrap(), 2);
		assert_eq!(peer.take_written(), b"ab");
		assert_eq!(client.last_activity(), Some(Duration::ZERO));

		peer.limit_writes(Some(0));
		assert_eq!(client.write(b"cd").unwrap(), 0);
		assert!(client.is_connected());

		peer.break_writes(ErrorKind::BrokenPipe);
		assert_eq!(client.write(b"cd").unwrap(), 0);
		assert_eq!(client.state(), LinkState::Error);
	}

	#[test]
	fn close_is_idempotent_and_releases_the_socket() {
		let (mut client, net, _clock) = client(LinkConfig::new());
		client.open("10.1.1.1", 2101).unwrap();
		client.poll().unwrap();
		let peer = net.last_peer().unwrap();

		client.close();
		client.close();
		assert!(peer.is_dropped());
		assert!(!client.is_open());
		assert_eq!(client.last_activity(), None);
		assert!(matches!(client.read(&mut [0u8; 4]), Err(LinkError::NotOpen)));

		client.open("10.1.1.1", 2101).unwrap();
		assert_eq!(client.state(), LinkState::Connecting);
	}
}
