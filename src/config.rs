//! Configuration for clients, servers and the NTRIP layer.
//!
//! Durations are typed; the signed-seconds convention of older feed tools
//! (`<= 0` disables a timeout, a negative reconnect wait means one-shot) is
//! accepted through the `from_secs` constructors.

use std::time::Duration;
use crate::error::LinkError;

/// Turns a signed seconds value into a timeout. `<= 0` (and NaN) is "none".
fn positive_secs(secs: f64) -> Option<Duration> {
	if !(secs > 0.0) {
		return None;
	}
	Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
}

/// What a client does after its link fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
	/// Retry on the very next poll.
	Immediate,

	/// Retry once this much time has passed since the failure.
	After(Duration),

	/// One-shot: the first failure is terminal and reported to the caller.
	Never,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		ReconnectPolicy::After(Duration::from_secs(1))
	}
}

impl ReconnectPolicy {
	/// `0` → immediate, `> 0` → wait that many seconds, `< 0` → one-shot.
	pub fn from_secs(secs: f64) -> Self {
		if secs < 0.0 {
			ReconnectPolicy::Never
		} else {
			positive_secs(secs).map_or(ReconnectPolicy::Immediate, ReconnectPolicy::After)
		}
	}

	pub fn is_one_shot(&self) -> bool {
		matches!(self, ReconnectPolicy::Never)
	}

	/// Whether a retry is allowed after waiting `waited`.
	pub(crate) fn retry_due(&self, waited: Duration) -> bool {
		match self {
			ReconnectPolicy::Immediate => true,
			ReconnectPolicy::After(wait) => waited >= *wait,
			ReconnectPolicy::Never => false,
		}
	}
}

/// Timeouts and reconnect behavior shared by the stream and datagram clients.
///
/// # Example
/// ```ignore
/// use std::time::Duration;
/// use feedlane::{LinkConfig, ReconnectPolicy};
///
/// let config = LinkConfig::new()
///     .connect_timeout(Duration::from_secs(5))
///     .inactive_timeout(Duration::from_secs(30))
///     .reconnect(ReconnectPolicy::After(Duration::from_secs(2)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
	/// Stream client only. `None` waits for the kernel's own verdict.
	pub connect_timeout: Option<Duration>,
	/// `None` never drops a quiet link.
	pub inactive_timeout: Option<Duration>,
	pub reconnect: ReconnectPolicy,
}

impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			connect_timeout: Some(Duration::from_secs(10)),
			inactive_timeout: None,
			reconnect: ReconnectPolicy::default(),
		}
	}
}

impl LinkConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds from signed seconds: `<= 0` disables a timeout, a negative
	/// reconnect wait selects one-shot mode.
	pub fn from_secs(connect_timeout: f64, inactive_timeout: f64, reconnect_wait: f64) -> Self {
		Self {
			connect_timeout: positive_secs(connect_timeout),
			inactive_timeout: positive_secs(inactive_timeout),
			reconnect: ReconnectPolicy::from_secs(reconnect_wait),
		}
	}

	/// Zero disables the timeout.
	pub fn connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = Some(timeout).filter(|t| !t.is_zero());
		self
	}

	/// Zero disables the timeout.
	pub fn inactive_timeout(mut self, timeout: Duration) -> Self {
		self.inactive_timeout = Some(timeout).filter(|t| !t.is_zero());
		self
	}

	pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
		self.reconnect = policy;
		self
	}
}

/// Which peers a server read drains, and which one it delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
	/// Nothing is read; reads only accept peers.
	None,

	/// The lowest occupied slot is delivered; the others are drained and discarded.
	#[default]
	OnlyFirst,

	/// A rotating cursor picks one occupied slot per read.
	RoundRobinAll,
}

impl ReadPolicy {
	/// Maps the numeric flag of older configs: 0 none, 1 only-first,
	/// 2 every peer. Anything else falls back to only-first.
	pub fn from_raw(raw: i32) -> Self {
		match raw {
			0 => ReadPolicy::None,
			2 => ReadPolicy::RoundRobinAll,
			_ => ReadPolicy::OnlyFirst,
		}
	}
}

/// Multi-client server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
	/// Maximum concurrent peers; later arrivals are accepted and closed.
	pub capacity: usize,
	pub read_policy: ReadPolicy,
	pub backlog: i32,
	/// Scratch size for draining peers whose bytes are not delivered.
	pub discard_buffer: usize,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			capacity: 32,
			read_policy: ReadPolicy::default(),
			backlog: 2,
			discard_buffer: 256,
		}
	}
}

impl ServerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
		self.read_policy = policy;
		self
	}

	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	pub fn discard_buffer(mut self, size: usize) -> Self {
		self.discard_buffer = size;
		self
	}

	pub(crate) fn validate(&self) -> Result<(), LinkError> {
		if self.capacity == 0 {
			return Err(LinkError::Config { reason: "server capacity must be at least 1".into() });
		}
		if self.discard_buffer == 0 {
			return Err(LinkError::Config { reason: "discard buffer must not be empty".into() });
		}
		Ok(())
	}
}

/// NTRIP client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtripConfig {
	pub link: LinkConfig,
	pub user_agent: String,
	/// Bytes of caster reply kept while waiting for the verdict.
	pub response_capacity: usize,
	/// Longest accepted base64 credential token.
	pub max_token_len: usize,
}

impl Default for NtripConfig {
	fn default() -> Self {
		Self {
			link: LinkConfig::default(),
			user_agent: concat!("NTRIP feedlane/", env!("CARGO_PKG_VERSION")).into(),
			response_capacity: 512,
			max_token_len: 64,
		}
	}
}

impl NtripConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn link(mut self, link: LinkConfig) -> Self {
		self.link = link;
		self
	}

	pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
		self.user_agent = agent.into();
		self
	}

	pub fn response_capacity(mut self, capacity: usize) -> Self {
		self.response_capacity = capacity;
		self
	}

	pub fn max_token_len(mut self, len: usize) -> Self {
		self.max_token_len = len;
		self
	}
}
