//! Time source for the timeouts.
//!
//! Timeouts are checked only when the caller polls, so they are bounded by
//! the poll cadence rather than wall-clock precise: a link that went stale
//! at T is noticed at the first read/write after T.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A monotonic clock.
pub trait Clock {
	fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
	#[inline]
	fn now(&self) -> Instant {
		Instant::now()
	}
}

/// A clock that only moves when told to.
///
/// Share it with `Arc` (or `&`) between the test and the client.
#[derive(Debug)]
pub struct ManualClock {
	base: Instant,
	offset: Mutex<Duration>,
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new()
	}
}

impl ManualClock {
	pub fn new() -> Self {
		Self {
			base: Instant::now(),
			offset: Mutex::new(Duration::ZERO),
		}
	}

	/// Moves time forward.
	pub fn advance(&self, by: Duration) {
		let mut offset = self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		*offset += by;
	}

	/// Moves time forward by `secs` seconds.
	pub fn advance_secs(&self, secs: f64) {
		self.advance(Duration::from_secs_f64(secs));
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Instant {
		let offset = *self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		self.base + offset
	}
}

impl<C: Clock + ?Sized> Clock for &C {
	fn now(&self) -> Instant {
		(**self).now()
	}
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
	fn now(&self) -> Instant {
		(**self).now()
	}
}
