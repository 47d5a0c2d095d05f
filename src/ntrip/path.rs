use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
	#[error("no ':' between user and password")]
	MissingPassword,

	#[error("no '@' before the caster host")]
	MissingHost,

	#[error("no ':' between host and port")]
	MissingPort,

	#[error("no '/' before the mount point")]
	MissingMount,

	#[error("invalid port '{0}'")]
	BadPort(String),
}

/// A caster target with credentials: `user:password@host:port/mount`.
///
/// The password may contain `:` and `@`; the user may not contain `:`.
/// The mount may be empty, which asks the caster for its source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtripPath {
	pub user: String,
	pub password: String,
	pub host: String,
	pub port: u16,
	pub mount: String,
}

impl NtripPath {
	pub fn new(
		user: impl Into<String>,
		password: impl Into<String>,
		host: impl Into<String>,
		port: u16,
		mount: impl Into<String>,
	) -> Self {
		Self {
			user: user.into(),
			password: password.into(),
			host: host.into(),
			port,
			mount: mount.into(),
		}
	}
}

/* Split points, in this order:
 *
 *   alice:se:cr@t@caster.example.net:2101/MOUNT1
 *        ^       ^                  ^    ^
 *        |       |                  |    first '/' after that
 *        |       |                  first ':' after the '@'
 *        |       last '@'
 *        first ':'
 */
impl FromStr for NtripPath {
	type Err = PathError;

	fn from_str(path: &str) -> Result<Self, Self::Err> {
		let colon = path.find(':').ok_or(PathError::MissingPassword)?;
		let at = path.rfind('@').ok_or(PathError::MissingHost)?;
		if colon > at {
			return Err(PathError::MissingPassword);
		}

		let location = &path[at + 1..];
		let port_sep = location.find(':').ok_or(PathError::MissingPort)?;
		let slash = location[port_sep..].find('/').ok_or(PathError::MissingMount)? + port_sep;

		let port = &location[port_sep + 1..slash];
		let port = port.parse::<u16>().map_err(|_| PathError::BadPort(port.to_string()))?;

		Ok(NtripPath {
			user: path[..colon].to_string(),
			password: path[colon + 1..at].to_string(),
			host: location[..port_sep].to_string(),
			port,
			mount: location[slash + 1..].to_string(),
		})
	}
}

impl fmt::Display for NtripPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}@{}:{}/{}", self.user, self.password, self.host, self.port, self.mount)
	}
}
