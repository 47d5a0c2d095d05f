use std::os::fd::AsRawFd;
use std::time::Duration;
use super::{set_tcp_nodelay, set_keepalive, set_keepalive_idle,
			set_keepalive_interval, set_keepalive_count};

/// Kernel keep-alive probing for an idle stream.
///
/// A dead peer is declared after `idle + interval * probes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
	pub idle: Duration,
	pub interval: Duration,
	pub probes: u32,
}

impl Default for KeepaliveConfig {
	fn default() -> Self {
		Self {
			idle: Duration::from_secs(60),
			interval: Duration::from_secs(10),
			probes: 5,
		}
	}
}

impl KeepaliveConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Spreads a detection window over idle time and probes.
	///
	/// Half of the window is spent idle, the rest is split between
	/// `probes` probes. Everything is rounded up to whole seconds since
	/// that is the kernel's granularity.
	pub fn within(window: Duration, probes: u32) -> Self {
		let probes = probes.max(1);
		let idle = whole_secs(window / 2);
		let interval = whole_secs(window.saturating_sub(window / 2) / probes);
		Self { idle, interval, probes }
	}

	pub fn idle(mut self, idle: Duration) -> Self {
		self.idle = idle;
		self
	}

	pub fn interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	pub fn probes(mut self, probes: u32) -> Self {
		self.probes = probes;
		self
	}

	/// How long a silent peer survives before the kernel resets the link.
	pub fn detection_time(&self) -> Duration {
		self.idle + self.interval * self.probes
	}

	fn apply<S: AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		set_keepalive(socket, true)?;
		set_keepalive_idle(socket, secs(self.idle))?;
		set_keepalive_interval(socket, secs(self.interval))?;
		set_keepalive_count(socket, self.probes.max(1))
	}
}

fn whole_secs(d: Duration) -> Duration {
	Duration::from_secs(secs(d) as u64)
}

/// Seconds, rounded up and never below one.
fn secs(d: Duration) -> u32 {
	let whole = d.as_secs() + u64::from(d.subsec_nanos() > 0);
	whole.clamp(1, u32::MAX as u64) as u32
}

/// TCP options applied to every outgoing stream socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConfig {
	pub nodelay: bool,
	pub keepalive: Option<KeepaliveConfig>,
}

impl Default for TcpConfig {
	fn default() -> Self {
		// Correction frames are small and latency-bound.
		Self { nodelay: true, keepalive: None }
	}
}

impl TcpConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn nodelay(mut self, enable: bool) -> Self {
		self.nodelay = enable;
		self
	}

	pub fn keepalive(mut self, config: KeepaliveConfig) -> Self {
		self.keepalive = Some(config);
		self
	}

	pub(crate) fn apply<S: AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		if self.nodelay {
			set_tcp_nodelay(socket, true)?;
		}
		match self.keepalive {
			Some(keepalive) => keepalive.apply(socket),
			None => Ok(()),
		}
	}
}
