use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub(crate) const SUCCESS_MARKER: &[u8] = b"ICY 200 OK\r\n";
pub(crate) const REJECT_MARKER: &[u8] = b"HTTP/";

/// `Basic` credential token: standard base64 of `user:password`.
pub(crate) fn auth_token(user: &str, password: &str) -> String {
	STANDARD.encode(format!("{}:{}", user, password))
}

pub(crate) fn request(mount: &str, user_agent: &str, token: &str) -> Vec<u8> {
	format!(
		"GET /{} HTTP/1.0\r\nUser-Agent: {}\r\nAuthorization: Basic {}\r\n\r\n",
		mount, user_agent, token
	)
	.into_bytes()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
	haystack.windows(needle.len()).any(|window| window == needle)
}

/// What the caster has said so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
	Incomplete,
	Accepted,
	/// Any HTTP status line, even `200`: the caster is not speaking NTRIP v1.
	Rejected,
	Overflow,
}

/// Fixed-capacity accumulator for the caster's reply.
#[derive(Debug)]
pub(crate) struct ResponseBuffer {
	buf: Vec<u8>,
	len: usize,
}

impl ResponseBuffer {
	pub(crate) fn new(capacity: usize) -> Self {
		Self { buf: vec![0u8; capacity], len: 0 }
	}

	/// Room left for the next read.
	pub(crate) fn spare(&mut self) -> &mut [u8] {
		&mut self.buf[self.len..]
	}

	/// Records `n` bytes written into [`spare`](Self::spare) and judges
	/// the reply so far.
	pub(crate) fn commit(&mut self, n: usize) -> Verdict {
		self.len = (self.len + n).min(self.buf.len());
		let seen = &self.buf[..self.len];

		if contains(seen, SUCCESS_MARKER) {
			Verdict::Accepted
		} else if contains(seen, REJECT_MARKER) {
			Verdict::Rejected
		} else if self.len >= self.buf.len() {
			Verdict::Overflow
		} else {
			Verdict::Incomplete
		}
	}

	/// What arrived so far, for logging a rejection.
	pub(crate) fn head(&self) -> &[u8] {
		let end = self.buf[..self.len].iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(self.len);
		&self.buf[..end]
	}

	pub(crate) fn clear(&mut self) {
		self.len = 0;
	}

	pub(crate) fn len(&self) -> usize {
		self.len
	}
}
