//! NTRIP v1 client.
//!
//! Wraps a [`StreamClient`] and performs the caster handshake on top of it:
//! send `GET /<mount>` with Basic credentials, wait for `ICY 200 OK`, then
//! step aside and pass bytes straight through. Whenever the underlying link
//! drops, the handshake starts over on the next call.

mod handshake;
mod path;

use std::fmt;
use std::time::Duration;
use crate::client::{LinkState, StreamClient};
use crate::clock::{Clock, MonotonicClock};
use crate::config::NtripConfig;
use crate::error::LinkError;
use crate::socket::{Net, Os};
use self::handshake::{ResponseBuffer, Verdict};

pub use self::path::{NtripPath, PathError};

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
	/// Not opened; every I/O call fails.
	New,

	/// Sending the request, or waiting for the link to come up.
	Connecting,

	/// Request sent; collecting the caster's reply.
	AwaitingResponse,

	/// Handshake done; I/O passes straight through.
	Streaming,
}

impl fmt::Display for HandshakeState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HandshakeState::New => write!(f, "new"),
			HandshakeState::Connecting => write!(f, "connecting"),
			HandshakeState::AwaitingResponse => write!(f, "awaiting-response"),
			HandshakeState::Streaming => write!(f, "streaming"),
		}
	}
}

/// An NTRIP client that keeps its caster session alive.
///
/// # Example
/// ```ignore
/// use feedlane::{NtripClient, NtripConfig};
///
/// let mut ntrip = NtripClient::new(NtripConfig::new());
/// ntrip.open_path("alice:secret@caster.example.net:2101/MOUNT1")?;
/// let mut buf = [0u8; 4096];
/// loop {
///     let n = ntrip.read(&mut buf)?;   // RTCM once streaming
///     ntrip.write(gga.as_bytes())?;
/// }
/// ```
pub struct NtripClient<N: Net = Os, C: Clock = MonotonicClock> {
	link: StreamClient<N, C>,
	config: NtripConfig,
	target: Option<NtripPath>,
	request: Vec<u8>,
	response: ResponseBuffer,
	state: HandshakeState,
}

impl NtripClient {
	pub fn new(config: NtripConfig) -> Self {
		Self::with_net(Os::new(), MonotonicClock, config)
	}
}

impl<N: Net, C: Clock> NtripClient<N, C> {
	pub fn with_net(net: N, clock: C, config: NtripConfig) -> Self {
		Self {
			link: StreamClient::with_net(net, clock, config.link),
			response: ResponseBuffer::new(config.response_capacity),
			config,
			target: None,
			request: Vec::new(),
			state: HandshakeState::New,
		}
	}

	/// Stores the credentials and starts connecting to the caster.
	pub fn open(
		&mut self,
		host: &str,
		port: u16,
		user: &str,
		password: &str,
		mount: &str,
	) -> Result<(), LinkError> {
		self.open_target(NtripPath::new(user, password, host, port, mount))
	}

	/// Parses `user:password@host:port/mount` and opens it.
	pub fn open_path(&mut self, path: &str) -> Result<(), LinkError> {
		let target = path.parse::<NtripPath>()?;
		self.open_target(target)
	}

	pub fn open_target(&mut self, target: NtripPath) -> Result<(), LinkError> {
		if self.state != HandshakeState::New {
			return Err(LinkError::Busy);
		}
		if self.config.response_capacity == 0 {
			return Err(LinkError::Config { reason: "response buffer must not be empty".into() });
		}
		let token = handshake::auth_token(&target.user, &target.password);
		if token.len() > self.config.max_token_len {
			return Err(LinkError::Config {
				reason: format!(
					"credential token is {} bytes, limit is {}",
					token.len(),
					self.config.max_token_len
				),
			});
		}

		self.link.open(&target.host, target.port)?;
		self.request = handshake::request(&target.mount, &self.config.user_agent, &token);
		self.response.clear();
		self.state = HandshakeState::Connecting;
		log::debug!("[ntrip] open {}:{}/{}", target.host, target.port, target.mount);
		self.target = Some(target);
		Ok(())
	}

	/// Moves the handshake forward. `Ok(true)` once streaming.
	fn advance(&mut self) -> Result<bool, LinkError> {
		if self.state == HandshakeState::New {
			return Err(LinkError::NotOpen);
		}
		if !self.link.is_connected() && self.state != HandshakeState::Connecting {
			log::debug!("[ntrip] link down while {}, restarting handshake", self.state);
			self.state = HandshakeState::Connecting;
			self.response.clear();
		}

		if self.state == HandshakeState::Connecting {
			let sent = self.link.write(&self.request)?;
			if sent == self.request.len() {
				log::debug!("[ntrip] request sent, awaiting caster reply");
				self.state = HandshakeState::AwaitingResponse;
			} else if sent > 0 {
				log::debug!("[ntrip] request cut short at {}/{} bytes, resending", sent, self.request.len());
			}
		}

		if self.state == HandshakeState::AwaitingResponse {
			let n = self.link.read(self.response.spare())?;
			if n > 0 {
				self.judge(n);
			}
		}

		Ok(self.state == HandshakeState::Streaming)
	}

	fn judge(&mut self, n: usize) {
		match self.response.commit(n) {
			Verdict::Incomplete => return,
			Verdict::Accepted => {
				if let Some(target) = &self.target {
					log::info!("[ntrip] streaming {} from {}:{}", target.mount, target.host, target.port);
				}
				self.state = HandshakeState::Streaming;
			}
			Verdict::Rejected => {
				log::warn!(
					"[ntrip] caster rejected handshake: {}",
					String::from_utf8_lossy(self.response.head())
				);
				self.state = HandshakeState::Connecting;
			}
			Verdict::Overflow => {
				log::warn!("[ntrip] {} bytes of reply without a verdict, retrying", self.response.len());
				self.state = HandshakeState::Connecting;
			}
		}
		self.response.clear();
	}

	/// Advances the handshake; once streaming, reads caster data.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
		if !self.advance()? {
			return Ok(0);
		}
		self.link.read(buf)
	}

	/// Advances the handshake; once streaming, sends `data` (typically NMEA
	/// GGA sentences for VRS mount points).
	pub fn write(&mut self, data: &[u8]) -> Result<usize, LinkError> {
		if !self.advance()? {
			return Ok(0);
		}
		self.link.write(data)
	}

	/// Drops the link and forgets the credentials. Safe to repeat.
	pub fn close(&mut self) {
		self.link.close();
		self.target = None;
		self.request.clear();
		self.response.clear();
		self.state = HandshakeState::New;
	}

	pub fn state(&self) -> HandshakeState {
		self.state
	}

	pub fn is_streaming(&self) -> bool {
		self.state == HandshakeState::Streaming
	}

	/// State of the underlying TCP link.
	pub fn link_state(&self) -> LinkState {
		self.link.state()
	}

	pub fn last_activity(&self) -> Option<Duration> {
		self.link.last_activity()
	}

	/// The caster target, credentials included.
	pub fn target(&self) -> Option<&NtripPath> {
		self.target.as_ref()
	}

	/// The target as `user:password@host:port/mount`.
	pub fn path(&self) -> Option<String> {
		self.target.as_ref().map(NtripPath::to_string)
	}

	pub fn config(&self) -> &NtripConfig {
		&self.config
	}
}

impl<N: Net, C: Clock> fmt::Debug for NtripClient<N, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NtripClient")
			.field("state", &self.state)
			.field("link", &self.link.state())
			.field("mount", &self.target.as_ref().map(|t| t.mount.as_str()))
			.finish()
	}
}
