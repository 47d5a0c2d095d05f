/// Socket creation/configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
	#[error("socket() failed: {}", errno_to_str(*.errno))]
	Create { errno: i32 },

	#[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
	Bind { errno: i32, addr: String },

	#[error("listen(backlog={backlog}) failed: {}", errno_to_str(*.errno))]
	Listen { errno: i32, backlog: i32 },

	#[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
	Connect { errno: i32, addr: String },

	#[error("accept() failed: {}", errno_to_str(*.errno))]
	Accept { errno: i32 },

	#[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
	SetOption { errno: i32, option: &'static str },

	#[error("getsockopt({option}) failed: {}", errno_to_str(*.errno))]
	GetOption { errno: i32, option: &'static str },

	#[error("getaddrinfo({endpoint}) failed: {reason}")]
	Resolve { endpoint: String, reason: String },

	#[error("invalid address: {reason}")]
	InvalidAddress { reason: &'static str },
}

/// I/O operation errors.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
	#[error("recv() failed: {}", errno_to_str(*.errno))]
	Read { errno: i32 },

	#[error("send() failed: {}", errno_to_str(*.errno))]
	Write { errno: i32 },
}

/// Errors surfaced by the clients, the server and the NTRIP layer.
///
/// Ordinary network trouble never shows up here: would-block, in-progress
/// connects and outages under a retrying policy are reported as zero bytes.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
	#[error("already open")]
	Busy,

	#[error("not open")]
	NotOpen,

	#[error("cannot reach {endpoint}: {source}")]
	Resolve {
		endpoint: String,
		#[source]
		source: std::io::Error,
	},

	#[error("reconnect to {endpoint} failed: {source}")]
	Reconnect {
		endpoint: String,
		#[source]
		source: std::io::Error,
	},

	#[error("link to {endpoint} failed and will not be retried")]
	Terminal { endpoint: String },

	#[error("invalid configuration: {reason}")]
	Config { reason: String },

	#[error(transparent)]
	Path(#[from] crate::ntrip::PathError),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl LinkError {
	/// True when the instance will make no further progress until it is
	/// closed and reopened.
	pub fn is_terminal(&self) -> bool {
		matches!(self, LinkError::Terminal { .. })
	}
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
	unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
	match errno {
		libc::EACCES => "permission denied".into(),
		libc::EADDRINUSE => "address already in use".into(),
		libc::EADDRNOTAVAIL => "address not available".into(),
		libc::EAFNOSUPPORT => "address family not supported".into(),
		libc::EAGAIN => "resource temporarily unavailable".into(),
		libc::EBADF => "bad file descriptor".into(),
		libc::ECONNREFUSED => "connection refused".into(),
		libc::ECONNRESET => "connection reset by peer".into(),
		libc::EHOSTUNREACH => "host unreachable".into(),
		libc::EINPROGRESS => "operation in progress".into(),
		libc::EINTR => "interrupted by signal".into(),
		libc::EINVAL => "invalid argument".into(),
		libc::EMFILE => "too many open files".into(),
		libc::ENETUNREACH => "network unreachable".into(),
		libc::ENOBUFS => "no buffer space available".into(),
		libc::ENOTCONN => "not connected".into(),
		libc::EPIPE => "broken pipe".into(),
		libc::ETIMEDOUT => "connection timed out".into(),
		_ => format!("errno {}", errno),
	}
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
	match errno {
		libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
		libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
		libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
		libc::EAGAIN => std::io::ErrorKind::WouldBlock,
		libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
		libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
		libc::EHOSTUNREACH => std::io::ErrorKind::HostUnreachable,
		libc::ENETUNREACH => std::io::ErrorKind::NetworkUnreachable,
		libc::EINTR => std::io::ErrorKind::Interrupted,
		libc::EINVAL => std::io::ErrorKind::InvalidInput,
		libc::ENOTCONN => std::io::ErrorKind::NotConnected,
		libc::EPIPE => std::io::ErrorKind::BrokenPipe,
		libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
		_ => std::io::ErrorKind::Other,
	}
}

impl From<SocketError> for std::io::Error {
	fn from(err: SocketError) -> Self {
		let kind = match &err {
			SocketError::Create { errno } => errno_to_kind(*errno),
			SocketError::Bind { errno, .. } => errno_to_kind(*errno),
			SocketError::Listen { errno, .. } => errno_to_kind(*errno),
			SocketError::Connect { errno, .. } => errno_to_kind(*errno),
			SocketError::Accept { errno } => errno_to_kind(*errno),
			SocketError::SetOption { errno, .. } => errno_to_kind(*errno),
			SocketError::GetOption { errno, .. } => errno_to_kind(*errno),
			SocketError::Resolve { .. } => std::io::ErrorKind::NotFound,
			SocketError::InvalidAddress { .. } => std::io::ErrorKind::InvalidInput,
		};
		std::io::Error::new(kind, err)
	}
}

impl From<IoError> for std::io::Error {
	fn from(err: IoError) -> Self {
		let kind = match &err {
			IoError::Read { errno } => errno_to_kind(*errno),
			IoError::Write { errno } => errno_to_kind(*errno),
		};
		std::io::Error::new(kind, err)
	}
}
