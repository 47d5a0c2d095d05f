//! Self-healing point-to-point clients.
//!
//! [`StreamClient`] and [`DatagramClient`] run the same connection automaton.
//! The caller just keeps calling `read`/`write`; each call first advances
//! the link by one step, then moves bytes if the link is up.
//!
/* ┌────────────┬──────────────────────────────┬───────────────────────────────┐
 * │ State      │ Leaves when                  │ Goes to                       │
 * ├────────────┼──────────────────────────────┼───────────────────────────────┤
 * │ Connecting │ handshake completes          │ Connected                     │
 * │            │ handshake fails / times out  │ Error                         │
 * │ Connected  │ peer closes, I/O error,      │ Error                         │
 * │            │ inactivity timeout           │                               │
 * │ Error      │ same step                    │ Waiting, or terminal          │
 * │            │                              │ (one-shot)                    │
 * │ Waiting    │ reconnect wait elapsed       │ Connecting / Connected        │
 * └────────────┴──────────────────────────────┴───────────────────────────────┘
 */

mod automaton;
mod datagram;
mod stream;

use std::fmt;

pub use self::datagram::DatagramClient;
pub use self::stream::StreamClient;

/// Where a client's link is.
///
/// A socket handle exists exactly in `Connecting` and `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
	/// Closed, never opened, or just failed.
	Error,

	/// Failed; a reconnect is due once the wait elapses.
	Waiting,

	/// Stream connect in flight.
	Connecting,

	Connected,
}

impl fmt::Display for LinkState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LinkState::Error => write!(f, "error"),
			LinkState::Waiting => write!(f, "waiting"),
			LinkState::Connecting => write!(f, "connecting"),
			LinkState::Connected => write!(f, "connected"),
		}
	}
}
