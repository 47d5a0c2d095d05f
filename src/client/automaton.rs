use std::convert::Infallible;
use std::time::{Duration, Instant};
use crate::addr::{Endpoint, SockAddr};
use crate::clock::Clock;
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::socket::{self, Channel, ConnectStatus, Datagram, Net, Pending, Stream};
use super::LinkState;

/// What a connect attempt produced.
pub(crate) enum Started<P, H> {
	/// Stream connect in flight.
	InProgress(P),
	/// Usable at once (datagrams).
	Ready(H),
}

/// The transport-specific half of the automaton.
pub(crate) trait Connector {
	type Pending;
	type Handle: Channel;

	/// Log tag.
	const TAG: &'static str;

	fn resolve(&self, endpoint: &Endpoint) -> std::io::Result<Vec<SockAddr>>;

	fn start(&self, addr: &SockAddr) -> std::io::Result<Started<Self::Pending, Self::Handle>>;

	fn poll(&self, pending: &Self::Pending) -> std::io::Result<ConnectStatus>;

	fn finish(&self, pending: Self::Pending) -> Self::Handle;
}

pub(crate) struct StreamConnector<N>(pub(crate) N);

impl<N: Net> Connector for StreamConnector<N> {
	type Pending = N::Pending;
	type Handle = N::Stream;

	const TAG: &'static str = "stream";

	fn resolve(&self, endpoint: &Endpoint) -> std::io::Result<Vec<SockAddr>> {
		self.0.resolve::<Stream>(endpoint, false)
	}

	fn start(&self, addr: &SockAddr) -> std::io::Result<Started<N::Pending, N::Stream>> {
		self.0.connect_stream(addr).map(Started::InProgress)
	}

	fn poll(&self, pending: &N::Pending) -> std::io::Result<ConnectStatus> {
		pending.poll_connect()
	}

	fn finish(&self, pending: N::Pending) -> N::Stream {
		pending.finish()
	}
}

pub(crate) struct DatagramConnector<N>(pub(crate) N);

impl<N: Net> Connector for DatagramConnector<N> {
	type Pending = Infallible;
	type Handle = N::Datagram;

	const TAG: &'static str = "datagram";

	fn resolve(&self, endpoint: &Endpoint) -> std::io::Result<Vec<SockAddr>> {
		self.0.resolve::<Datagram>(endpoint, false)
	}

	fn start(&self, addr: &SockAddr) -> std::io::Result<Started<Infallible, N::Datagram>> {
		self.0.connect_datagram(addr).map(Started::Ready)
	}

	fn poll(&self, pending: &Infallible) -> std::io::Result<ConnectStatus> {
		match *pending {}
	}

	fn finish(&self, pending: Infallible) -> N::Datagram {
		match pending {}
	}
}

/// Where the link is. The socket handle lives inside the variant that
/// needs it, so `Error` and `Waiting` cannot hold one.
enum Phase<P, H> {
	Error,
	Waiting,
	Connecting(P),
	Connected(H),
}

impl<P, H> Phase<P, H> {
	fn state(&self) -> LinkState {
		match self {
			Phase::Error => LinkState::Error,
			Phase::Waiting => LinkState::Waiting,
			Phase::Connecting(_) => LinkState::Connecting,
			Phase::Connected(_) => LinkState::Connected,
		}
	}
}

impl<P, H> From<Started<P, H>> for Phase<P, H> {
	fn from(started: Started<P, H>) -> Self {
		match started {
			Started::InProgress(pending) => Phase::Connecting(pending),
			Started::Ready(handle) => Phase::Connected(handle),
		}
	}
}

/// Resolves `endpoint` and tries each candidate until a connect starts.
fn connect_any<K: Connector>(
	connector: &K,
	endpoint: &Endpoint,
) -> std::io::Result<Started<K::Pending, K::Handle>> {
	let candidates = connector.resolve(endpoint)?;
	let mut last_err = None;
	for addr in &candidates {
		match connector.start(addr) {
			Ok(started) => return Ok(started),
			Err(err) => {
				log::debug!("[{}] {} via {} failed: {}", K::TAG, endpoint, addr, err);
				last_err = Some(err);
			}
		}
	}
	Err(last_err.unwrap_or_else(|| std::io::ErrorKind::NotFound.into()))
}

fn expired(idle: Duration, timeout: Option<Duration>) -> bool {
	timeout.is_some_and(|limit| idle >= limit)
}

/// The connection lifecycle shared by the stream and datagram clients.
///
/// Nothing runs in the background. Every `read`/`write` first calls
/// [`maintain`](Self::maintain), which moves the automaton along by looking
/// at the clock, then tries the I/O if the link is up.
pub(crate) struct Automaton<K: Connector, C: Clock> {
	connector: K,
	clock: C,
	config: LinkConfig,
	endpoint: Option<Endpoint>,
	phase: Phase<K::Pending, K::Handle>,
	activity: Option<Instant>,
}

impl<K: Connector, C: Clock> Automaton<K, C> {
	pub(crate) fn new(connector: K, clock: C, config: LinkConfig) -> Self {
		Self {
			connector,
			clock,
			config,
			endpoint: None,
			phase: Phase::Error,
			activity: None,
		}
	}

	pub(crate) fn open(&mut self, endpoint: Endpoint) -> Result<(), LinkError> {
		if matches!(self.phase, Phase::Connecting(_) | Phase::Connected(_)) {
			return Err(LinkError::Busy);
		}
		let started = connect_any(&self.connector, &endpoint).map_err(|source| {
			log::debug!("[{}] open {} failed: {}", K::TAG, endpoint, source);
			LinkError::Resolve { endpoint: endpoint.to_string(), source }
		})?;

		self.phase = started.into();
		self.activity = Some(self.clock.now());
		log::debug!("[{}] open {} -> {}", K::TAG, endpoint, self.phase.state());
		self.endpoint = Some(endpoint);
		Ok(())
	}

	/// Runs one maintenance step.
	///
	/// `Err` only for "never opened", a failed retry, or a one-shot link
	/// that has died. Everything else is absorbed.
	pub(crate) fn maintain(&mut self) -> Result<(), LinkError> {
		let Some(endpoint) = self.endpoint.as_ref() else {
			return Err(LinkError::NotOpen);
		};
		let now = self.clock.now();
		let idle = now.saturating_duration_since(self.activity.unwrap_or(now));

		let was_error = matches!(self.phase, Phase::Error);
		let phase = match std::mem::replace(&mut self.phase, Phase::Error) {
			Phase::Error => Phase::Error,
			Phase::Waiting => {
				if !self.config.reconnect.retry_due(idle) {
					Phase::Waiting
				} else {
					match connect_any(&self.connector, endpoint) {
						Ok(started) => {
							self.activity = Some(now);
							let phase = Phase::from(started);
							log::debug!("[{}] reconnect {} -> {}", K::TAG, endpoint, phase.state());
							phase
						}
						Err(source) => {
							self.phase = Phase::Waiting;
							log::debug!("[{}] reconnect {} failed: {}", K::TAG, endpoint, source);
							return Err(LinkError::Reconnect { endpoint: endpoint.to_string(), source });
						}
					}
				}
			}
			Phase::Connecting(pending) => match self.connector.poll(&pending) {
				Ok(ConnectStatus::Pending) => {
					if expired(idle, self.config.connect_timeout) {
						log::info!("[{}] connect to {} timed out after {:?}", K::TAG, endpoint, idle);
						Phase::Error
					} else {
						Phase::Connecting(pending)
					}
				}
				Ok(ConnectStatus::Connected) => {
					self.activity = Some(now);
					log::info!("[{}] connected to {}", K::TAG, endpoint);
					Phase::Connected(self.connector.finish(pending))
				}
				Ok(ConnectStatus::Failed(err)) | Err(err) => {
					log::info!("[{}] connect to {} failed: {}", K::TAG, endpoint, err);
					Phase::Error
				}
			},
			Phase::Connected(handle) => {
				if expired(idle, self.config.inactive_timeout) {
					log::info!("[{}] {} silent for {:?}, dropping link", K::TAG, endpoint, idle);
					Phase::Error
				} else {
					Phase::Connected(handle)
				}
			}
		};

		if !matches!(phase, Phase::Error) {
			self.phase = phase;
			return Ok(());
		}

		// The handle, if any, was dropped with the old phase.
		if self.config.reconnect.is_one_shot() {
			if !was_error {
				log::warn!("[{}] link to {} lost, one-shot mode: not retrying", K::TAG, endpoint);
			}
			return Err(LinkError::Terminal { endpoint: endpoint.to_string() });
		}
		self.phase = Phase::Waiting;
		self.activity = Some(now);
		Ok(())
	}

	pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
		self.maintain()?;
		let Phase::Connected(handle) = &self.phase else {
			return Ok(0);
		};
		if buf.is_empty() {
			return Ok(0);
		}
		let result = handle.recv(buf);
		Ok(self.settle(result, "recv"))
	}

	pub(crate) fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
		self.maintain()?;
		let Phase::Connected(handle) = &self.phase else {
			return Ok(0);
		};
		if data.is_empty() {
			return Ok(0);
		}
		let result = handle.send(data);
		Ok(self.settle(result, "send"))
	}

	/// Books the outcome of one transfer. Zero bytes or a hard error drops
	/// the link; the next maintenance step deals with it.
	fn settle(&mut self, result: std::io::Result<usize>, op: &str) -> usize {
		match result {
			Ok(0) => {
				self.drop_link(format_args!("{} returned 0, peer closed", op));
				0
			}
			Ok(n) => {
				self.activity = Some(self.clock.now());
				n
			}
			Err(err) if socket::is_transient(&err) => 0,
			Err(err) => {
				self.drop_link(format_args!("{} failed: {}", op, err));
				0
			}
		}
	}

	fn drop_link(&mut self, why: std::fmt::Arguments<'_>) {
		if let Some(endpoint) = &self.endpoint {
			log::info!("[{}] link to {} down: {}", K::TAG, endpoint, why);
		}
		self.phase = Phase::Error;
	}

	pub(crate) fn close(&mut self) {
		if let Some(endpoint) = self.endpoint.take() {
			log::debug!("[{}] close {}", K::TAG, endpoint);
		}
		self.phase = Phase::Error;
		self.activity = None;
	}

	pub(crate) fn state(&self) -> LinkState {
		self.phase.state()
	}

	pub(crate) fn is_connected(&self) -> bool {
		matches!(self.phase, Phase::Connected(_))
	}

	pub(crate) fn is_open(&self) -> bool {
		self.endpoint.is_some()
	}

	pub(crate) fn last_activity(&self) -> Option<Duration> {
		self.activity.map(|at| self.clock.now().saturating_duration_since(at))
	}

	pub(crate) fn endpoint(&self) -> Option<&Endpoint> {
		self.endpoint.as_ref()
	}

	pub(crate) fn config(&self) -> &LinkConfig {
		&self.config
	}
}
