use std::{
	net::{Ipv4Addr, SocketAddr},
	time::Duration,
};

/// The UDP port LIFX devices listen on.
pub const LIFX_PORT: u16 = 56700;

/// Settings for a [crate::Manager].
#[derive(Debug, Clone)]
pub struct Config {
	/// Local address to bind.  Port 0 picks an ephemeral port, which lets several clients run
	/// side by side; devices reply to whatever port the request came from.
	pub bind: SocketAddr,

	/// Port the devices listen on.
	pub port: u16,

	/// Source identifier stamped on every message.  Must be non-zero, otherwise devices
	/// broadcast their replies instead of sending them back to us.
	pub source: u32,

	/// Where to send discovery and untargeted messages.  When empty, the broadcast address of
	/// every non-loopback IPv4 interface is used.
	pub broadcast: Vec<SocketAddr>,

	/// Minimum time between two state requests to the same device.
	pub refresh_interval: Duration,

	/// Cached state older than this is requested again.
	pub max_age: Duration,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			bind: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
			port: LIFX_PORT,
			source: 0x72757374,
			broadcast: Vec::new(),
			refresh_interval: Duration::from_millis(500),
			max_age: Duration::from_secs(15),
		}
	}
}
