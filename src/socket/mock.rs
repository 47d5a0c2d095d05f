//! Scripted in-memory provider for tests.
//!
//! [`MockNet`] implements [`Net`] without touching the OS. Tests script how
//! connects behave, then drive the far side of every handle through a
//! [`MockPeer`]: push bytes, read what was written, break or close it.
//!
//! ```ignore
//! let net = MockNet::new();
//! net.script_connect(ConnectPlan::Hang);
//! let mut client = StreamClient::with_net(net.clone(), clock, config);
//! client.open("caster", 2101)?;
//! let peer = net.last_peer().unwrap();
//! peer.complete_connect();
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::addr::{Endpoint, SockAddr};
use super::{AcceptResult, Acceptor, Channel, ConnectStatus, Net, Pending, SockType};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	// A panicking test thread must not hide the state from the next assertion.
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// How the next connect attempt behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPlan {
	/// Connect starts and completes on the first poll.
	Complete,

	/// Connect starts and stays pending until the peer settles it.
	Hang,

	/// Connect starts, then the first poll reports this failure.
	FailLater(std::io::ErrorKind),

	/// The connect call itself fails (refused, unreachable...).
	Refuse(std::io::ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
	Pending,
	Done,
	Failed(std::io::ErrorKind),
}

#[derive(Debug)]
struct Pipe {
	handshake: Handshake,
	inbound: VecDeque<u8>,
	outbound: Vec<u8>,
	peer_closed: bool,
	read_error: Option<std::io::ErrorKind>,
	write_error: Option<std::io::ErrorKind>,
	write_limit: Option<usize>,
	dropped: bool,
}

impl Pipe {
	fn new(handshake: Handshake) -> Self {
		Self {
			handshake,
			inbound: VecDeque::new(),
			outbound: Vec::new(),
			peer_closed: false,
			read_error: None,
			write_error: None,
			write_limit: None,
			dropped: false,
		}
	}
}

#[derive(Debug, Default)]
struct State {
	plans: VecDeque<ConnectPlan>,
	candidates: usize,
	fail_resolve: bool,
	fail_listen: bool,
	resolutions: usize,
	connect_attempts: usize,
	peers: Vec<MockPeer>,
	accept_queue: VecDeque<Arc<Mutex<Pipe>>>,
}

/// A scriptable [`Net`] provider. Clones share state.
#[derive(Debug, Clone)]
pub struct MockNet {
	state: Arc<Mutex<State>>,
}

impl Default for MockNet {
	fn default() -> Self {
		Self::new()
	}
}

impl MockNet {
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(State {
				candidates: 1,
				..State::default()
			})),
		}
	}

	/// Queues the behavior of a future connect attempt. Unscripted attempts
	/// use [`ConnectPlan::Complete`].
	pub fn script_connect(&self, plan: ConnectPlan) {
		lock(&self.state).plans.push_back(plan);
	}

	/// How many candidate addresses each resolution returns.
	pub fn set_candidates(&self, count: usize) {
		lock(&self.state).candidates = count;
	}

	/// Makes every resolution fail, as if DNS were down.
	pub fn fail_resolve(&self, fail: bool) {
		lock(&self.state).fail_resolve = fail;
	}

	/// Makes `listen` fail with `AddrInUse`.
	pub fn fail_listen(&self, fail: bool) {
		lock(&self.state).fail_listen = fail;
	}

	/// Number of times an endpoint was resolved.
	pub fn resolutions(&self) -> usize {
		lock(&self.state).resolutions
	}

	/// Number of connect attempts made, refused ones included.
	pub fn connect_attempts(&self) -> usize {
		lock(&self.state).connect_attempts
	}

	/// Far sides of every handle handed out so far, oldest first.
	pub fn peers(&self) -> Vec<MockPeer> {
		lock(&self.state).peers.clone()
	}

	/// Far side of the most recent handle.
	pub fn last_peer(&self) -> Option<MockPeer> {
		lock(&self.state).peers.last().cloned()
	}

	/// Queues an incoming connection for the next accept.
	pub fn incoming(&self) -> MockPeer {
		let pipe = Arc::new(Mutex::new(Pipe::new(Handshake::Done)));
		let peer = MockPeer { pipe: pipe.clone() };
		let mut state = lock(&self.state);
		state.accept_queue.push_back(pipe);
		state.peers.push(peer.clone());
		peer
	}

	fn start(&self, handshake: Handshake) -> MockStream {
		let pipe = Arc::new(Mutex::new(Pipe::new(handshake)));
		lock(&self.state).peers.push(MockPeer { pipe: pipe.clone() });
		MockStream { pipe }
	}

	fn next_plan(&self) -> ConnectPlan {
		let mut state = lock(&self.state);
		state.connect_attempts += 1;
		state.plans.pop_front().unwrap_or(ConnectPlan::Complete)
	}
}

impl Net for MockNet {
	type Stream = MockStream;
	type Pending = MockPending;
	type Datagram = MockStream;
	type Listener = MockListener;

	fn resolve<T: SockType>(&self, endpoint: &Endpoint, _passive: bool) -> std::io::Result<Vec<SockAddr>> {
		let mut state = lock(&self.state);
		state.resolutions += 1;
		if state.fail_resolve {
			return Err(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("cannot resolve {}", endpoint),
			));
		}
		let ip: std::net::IpAddr = endpoint.host().parse()
			.unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
		let port: u16 = endpoint.service().parse().unwrap_or(0);
		Ok((0..state.candidates)
			.map(|_| SockAddr::from(std::net::SocketAddr::new(ip, port)))
			.collect())
	}

	fn connect_stream(&self, _addr: &SockAddr) -> std::io::Result<MockPending> {
		let handshake = match self.next_plan() {
			ConnectPlan::Refuse(kind) => return Err(kind.into()),
			ConnectPlan::Complete => Handshake::Done,
			ConnectPlan::Hang => Handshake::Pending,
			ConnectPlan::FailLater(kind) => Handshake::Failed(kind),
		};
		Ok(MockPending { stream: self.start(handshake) })
	}

	fn connect_datagram(&self, _addr: &SockAddr) -> std::io::Result<MockStream> {
		match self.next_plan() {
			ConnectPlan::Refuse(kind) => Err(kind.into()),
			_ => Ok(self.start(Handshake::Done)),
		}
	}

	fn listen(&self, addr: &SockAddr, _backlog: i32) -> std::io::Result<MockListener> {
		if lock(&self.state).fail_listen {
			return Err(std::io::ErrorKind::AddrInUse.into());
		}
		Ok(MockListener { net: self.clone(), addr: *addr })
	}
}

/// The local end of a mock connection, owned by the code under test.
///
/// Dropping it marks the pipe closed, which the test sees through
/// [`MockPeer::is_dropped`].
#[derive(Debug)]
pub struct MockStream {
	pipe: Arc<Mutex<Pipe>>,
}

impl Channel for MockStream {
	fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
		let mut pipe = lock(&self.pipe);
		if let Some(kind) = pipe.write_error {
			return Err(kind.into());
		}
		let n = pipe.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
		if n == 0 && !buf.is_empty() {
			return Err(std::io::ErrorKind::WouldBlock.into());
		}
		pipe.outbound.extend_from_slice(&buf[..n]);
		Ok(n)
	}

	fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		let mut pipe = lock(&self.pipe);
		if let Some(kind) = pipe.read_error {
			return Err(kind.into());
		}
		if pipe.inbound.is_empty() {
			if pipe.peer_closed {
				return Ok(0);
			}
			return Err(std::io::ErrorKind::WouldBlock.into());
		}
		let n = buf.len().min(pipe.inbound.len());
		for (slot, byte) in buf.iter_mut().zip(pipe.inbound.drain(..n)) {
			*slot = byte;
		}
		Ok(n)
	}
}

impl Drop for MockStream {
	fn drop(&mut self) {
		lock(&self.pipe).dropped = true;
	}
}

/// A mock connect in flight.
#[derive(Debug)]
pub struct MockPending {
	stream: MockStream,
}

impl Pending for MockPending {
	type Stream = MockStream;

	fn poll_connect(&self) -> std::io::Result<ConnectStatus> {
		Ok(match lock(&self.stream.pipe).handshake {
			Handshake::Pending => ConnectStatus::Pending,
			Handshake::Done => ConnectStatus::Connected,
			Handshake::Failed(kind) => ConnectStatus::Failed(kind.into()),
		})
	}

	fn finish(self) -> MockStream {
		self.stream
	}
}

/// A mock listener; accepts whatever [`MockNet::incoming`] queued.
#[derive(Debug)]
pub struct MockListener {
	net: MockNet,
	addr: SockAddr,
}

impl Acceptor for MockListener {
	type Peer = MockStream;

	fn accept_nonblocking(&self) -> std::io::Result<AcceptResult<MockStream>> {
		let next = lock(&self.net.state).accept_queue.pop_front();
		Ok(match next {
			Some(pipe) => AcceptResult::Connection(MockStream { pipe }, self.addr),
			None => AcceptResult::WouldBlock,
		})
	}

	fn local_addr(&self) -> std::io::Result<SockAddr> {
		Ok(self.addr)
	}
}

/// The test's end of a mock connection.
#[derive(Debug, Clone)]
pub struct MockPeer {
	pipe: Arc<Mutex<Pipe>>,
}

impl MockPeer {
	/// Makes bytes available to the next `recv`.
	pub fn push(&self, data: &[u8]) {
		lock(&self.pipe).inbound.extend(data.iter().copied());
	}

	/// Takes everything written so far.
	pub fn take_written(&self) -> Vec<u8> {
		std::mem::take(&mut lock(&self.pipe).outbound)
	}

	/// Closes the far side: `recv` returns 0 once pending bytes are drained.
	pub fn close(&self) {
		lock(&self.pipe).peer_closed = true;
	}

	/// Every later `recv` fails with `kind`.
	pub fn break_reads(&self, kind: std::io::ErrorKind) {
		lock(&self.pipe).read_error = Some(kind);
	}

	/// Every later `send` fails with `kind`.
	pub fn break_writes(&self, kind: std::io::ErrorKind) {
		lock(&self.pipe).write_error = Some(kind);
	}

	/// Caps how many bytes a single `send` accepts. `0` makes sends block.
	pub fn limit_writes(&self, limit: Option<usize>) {
		lock(&self.pipe).write_limit = limit;
	}

	/// Completes a connect scripted with [`ConnectPlan::Hang`].
	pub fn complete_connect(&self) {
		lock(&self.pipe).handshake = Handshake::Done;
	}

	/// Fails a connect scripted with [`ConnectPlan::Hang`].
	pub fn fail_connect(&self, kind: std::io::ErrorKind) {
		lock(&self.pipe).handshake = Handshake::Failed(kind);
	}

	/// Whether the code under test has released its handle.
	pub fn is_dropped(&self) -> bool {
		lock(&self.pipe).dropped
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::socket::Stream;

	#[test]
	fn unscripted_connect_completes() {
		let net = MockNet::new();
		let addrs = net.resolve::<Stream>(&Endpoint::new("10.0.0.7", 2101), false).unwrap();
		assert_eq!(addrs[0].to_string(), "10.0.0.7:2101");

		let pending = net.connect_stream(&addrs[0]).unwrap();
		assert!(matches!(pending.poll_connect().unwrap(), ConnectStatus::Connected));
		assert_eq!(net.connect_attempts(), 1);
	}

	#[test]
	fn peer_sees_writes_and_feeds_reads() {
		let net = MockNet::new();
		let addr = SockAddr::from("127.0.0.1:1".parse::<std::net::SocketAddr>().unwrap());
		let stream = net.connect_stream(&addr).unwrap().finish();
		let peer = net.last_peer().unwrap();

		assert_eq!(stream.send(b"GET").unwrap(), 3);
		assert_eq!(peer.take_written(), b"GET");

		let mut buf = [0u8; 8];
		assert_eq!(stream.recv(&mut buf).unwrap_err().kind(), std::io::ErrorKind::WouldBlock);
		peer.push(b"ok");
		assert_eq!(stream.recv(&mut buf).unwrap(), 2);
		peer.close();
		assert_eq!(stream.recv(&mut buf).unwrap(), 0);

		drop(stream);
		assert!(peer.is_dropped());
	}

	#[test]
	fn write_limit_splits_sends() {
		let net = MockNet::new();
		let addr = SockAddr::from("127.0.0.1:1".parse::<std::net::SocketAddr>().unwrap());
		let stream = net.connect_datagram(&addr).unwrap();
		let peer = net.last_peer().unwrap();

		peer.limit_writes(Some(2));
		assert_eq!(stream.send(b"abcd").unwrap(), 2);
		peer.limit_writes(Some(0));
		assert_eq!(stream.send(b"cd").unwrap_err().kind(), std::io::ErrorKind::WouldBlock);
	}
}
