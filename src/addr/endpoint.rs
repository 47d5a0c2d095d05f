/// A destination as the caller names it: host plus service.
///
/// Stored unresolved. Every connect attempt resolves it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	host: String,
	service: String,
}

impl Endpoint {
	/// Creates an endpoint from a host name (or literal IP) and a port.
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			service: port.to_string(),
		}
	}

	/// Creates an endpoint from a host and a service string
	/// (a port number or a name from /etc/services).
	pub fn with_service(host: impl Into<String>, service: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			service: service.into(),
		}
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn service(&self) -> &str {
		&self.service
	}
}

impl std::fmt::Display for Endpoint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.host.contains(':') {
			write!(f, "[{}]:{}", self.host, self.service)
		} else {
			write!(f, "{}:{}", self.host, self.service)
		}
	}
}
