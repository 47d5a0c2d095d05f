pub mod socket;
pub mod client;
pub mod server;
pub mod ntrip;
pub mod clock;
pub mod config;
mod addr;
mod error;

pub use self::error::{IoError, LinkError, SocketError, errno};
pub use self::addr::{Endpoint, SockAddr};
pub use self::client::{DatagramClient, LinkState, StreamClient};
pub use self::server::StreamServer;
pub use self::ntrip::{HandshakeState, NtripClient, NtripPath, PathError};
pub use self::clock::{Clock, ManualClock, MonotonicClock};
pub use self::config::{LinkConfig, NtripConfig, ReadPolicy, ReconnectPolicy, ServerConfig};
pub use self::socket::{Net, Os, SockType, Stream, Datagram, Channel, TcpConfig, KeepaliveConfig,
					   RawSocket, BoundSocket, PendingConnect, ConnectedStream, ConnectedDatagram,
					   Listener};
pub use self::socket::{set_reuse_addr, set_tcp_nodelay,
					   set_keepalive, set_keepalive_idle, set_keepalive_interval, set_keepalive_count};
