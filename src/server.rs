//! Bounded multi-client stream server.
//!
//! One listener plus a fixed pool of peer slots. Like the clients, it does
//! all its work inside `read`/`write`: each call accepts at most one new
//! peer, then moves bytes.

use crate::addr::{Endpoint, SockAddr};
use crate::config::{ReadPolicy, ServerConfig};
use crate::error::LinkError;
use crate::socket::{self, AcceptResult, Acceptor, Channel, Net, Os, Stream};

/// Reads from the peer in `slot` and evicts it on end-of-stream or error.
fn drain<S: Channel>(slot: &mut Option<S>, index: usize, buf: &mut [u8]) -> usize {
	let Some(peer) = slot.as_ref() else {
		return 0;
	};
	if buf.is_empty() {
		return 0;
	}
	match peer.recv(buf) {
		Ok(0) => {
			log::warn!("[server] slot {} closed by peer, evicting", index);
			*slot = None;
			0
		}
		Ok(n) => n,
		Err(err) if socket::is_transient(&err) => 0,
		Err(err) => {
			log::warn!("[server] slot {} recv failed: {}, evicting", index, err);
			*slot = None;
			0
		}
	}
}

/// A TCP server feeding a small, bounded set of peers.
///
/// # Example
/// ```ignore
/// use feedlane::{ReadPolicy, ServerConfig, StreamServer};
///
/// let mut server = StreamServer::new(ServerConfig::new().read_policy(ReadPolicy::None));
/// server.open("", 2102)?;
/// loop {
///     server.write(&correction)?;
/// }
/// ```
pub struct StreamServer<N: Net = Os> {
	net: N,
	config: ServerConfig,
	listener: Option<N::Listener>,
	slots: Vec<Option<N::Stream>>,
	cursor: usize,
	discard: Vec<u8>,
}

impl StreamServer {
	pub fn new(config: ServerConfig) -> Self {
		Self::with_net(Os::new(), config)
	}
}

impl<N: Net> StreamServer<N> {
	pub fn with_net(net: N, config: ServerConfig) -> Self {
		Self {
			net,
			config,
			listener: None,
			slots: Vec::new(),
			cursor: 0,
			discard: Vec::new(),
		}
	}

	/// Binds and listens on `host:port`. An empty host means every local
	/// address.
	pub fn open(&mut self, host: &str, port: u16) -> Result<(), LinkError> {
		self.open_endpoint(Endpoint::new(host, port))
	}

	pub fn open_endpoint(&mut self, endpoint: Endpoint) -> Result<(), LinkError> {
		if self.listener.is_some() {
			return Err(LinkError::Busy);
		}
		self.config.validate()?;

		let resolve_err = |source: std::io::Error| LinkError::Resolve { endpoint: endpoint.to_string(), source };
		let candidates = self.net.resolve::<Stream>(&endpoint, true).map_err(resolve_err)?;

		let mut last_err = None;
		for addr in &candidates {
			match self.net.listen(addr, self.config.backlog) {
				Ok(listener) => {
					log::info!("[server] listening on {}", addr);
					self.listener = Some(listener);
					break;
				}
				Err(err) => {
					log::debug!("[server] listen on {} failed: {}", addr, err);
					last_err = Some(err);
				}
			}
		}
		if self.listener.is_none() {
			let source = last_err.unwrap_or_else(|| std::io::ErrorKind::NotFound.into());
			return Err(resolve_err(source));
		}

		self.slots = std::iter::repeat_with(|| None).take(self.config.capacity).collect();
		self.cursor = 0;
		self.discard = vec![0u8; self.config.discard_buffer];
		Ok(())
	}

	/// Accepts at most one pending peer. Returns whether one was taken
	/// into the pool.
	///
	/// When every slot is busy the newcomer is accepted and closed at once.
	pub fn poll(&mut self) -> Result<bool, LinkError> {
		let listener = self.listener.as_ref().ok_or(LinkError::NotOpen)?;
		let (peer, addr) = match listener.accept_nonblocking()? {
			AcceptResult::Connection(peer, addr) => (peer, addr),
			AcceptResult::WouldBlock | AcceptResult::Interrupted => return Ok(false),
		};

		match self.slots.iter().position(Option::is_none) {
			Some(index) => {
				log::info!("[server] {} joined slot {}", addr, index);
				self.slots[index] = Some(peer);
				Ok(true)
			}
			None => {
				log::warn!("[server] pool full ({}), rejecting {}", self.slots.len(), addr);
				drop(peer);
				Ok(false)
			}
		}
	}

	/// Accepts, then reads according to the configured [`ReadPolicy`].
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
		self.poll()?;

		match self.config.read_policy {
			ReadPolicy::None => Ok(0),
			ReadPolicy::OnlyFirst => {
				let mut delivered = None;
				for (index, slot) in self.slots.iter_mut().enumerate() {
					if slot.is_none() {
						continue;
					}
					if delivered.is_none() {
						delivered = Some(drain(slot, index, buf));
					} else {
						drain(slot, index, &mut self.discard);
					}
				}
				Ok(delivered.unwrap_or(0))
			}
			ReadPolicy::RoundRobinAll => {
				let capacity = self.slots.len();
				for _ in 0..capacity {
					let index = self.cursor;
					self.cursor = (self.cursor + 1) % capacity;
					if self.slots[index].is_some() {
						return Ok(drain(&mut self.slots[index], index, buf));
					}
				}
				Ok(0)
			}
		}
	}

	/// Accepts, then sends `data` to every peer.
	///
	/// Best effort: always reports `data.len()`. Peers that fail are
	/// evicted; short sends are not retried.
	pub fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
		self.poll()?;

		for (index, slot) in self.slots.iter_mut().enumerate() {
			let Some(peer) = slot.as_ref() else {
				continue;
			};
			match peer.send(data) {
				Ok(_) => {}
				Err(err) if socket::is_transient(&err) => {}
				Err(err) => {
					log::warn!("[server] slot {} send failed: {}, evicting", index, err);
					*slot = None;
				}
			}
		}
		Ok(data.len())
	}

	/// Closes the listener and every peer. Safe to repeat.
	pub fn close(&mut self) {
		if self.listener.take().is_some() {
			log::debug!("[server] closed with {} peers", self.client_count());
		}
		self.slots.clear();
		self.cursor = 0;
	}

	/// Number of occupied slots.
	pub fn client_count(&self) -> usize {
		self.slots.iter().filter(|slot| slot.is_some()).count()
	}

	pub fn is_open(&self) -> bool {
		self.listener.is_some()
	}

	/// Address the listener is bound to. Useful after binding port 0.
	pub fn local_addr(&self) -> Result<SockAddr, LinkError> {
		let listener = self.listener.as_ref().ok_or(LinkError::NotOpen)?;
		Ok(listener.local_addr()?)
	}

	pub fn config(&self) -> &ServerConfig {
		&self.config
	}
}

impl<N: Net> std::fmt::Debug for StreamServer<N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StreamServer")
			.field("open", &self.listener.is_some())
			.field("clients", &self.client_count())
			.field("read_policy", &self.config.read_policy)
			.finish()
	}
}
