//! A small client for LIFX bulbs on your local area network.
//!
//! Message encoding and decoding is done by the [lifx_core] crate; this crate deals with the
//! parts it leaves out: talking to the network, caching light state, and finding lights by ID or
//! label.
//!
//! The [Client] and [Light] traits describe what a caller can do with a set of lights.  The
//! [Manager] implements them over a UDP socket:
//!
//! ```no_run
//! use lifx_client::{Client, Config, Light, Manager};
//!
//! # fn main() -> lifx_client::Result<()> {
//! let mgr = Manager::new(Config::default())?;
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! for light in mgr.lights()? {
//! 	println!("{:016X} {}", light.id(), light.label()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Discovery
//!
//! A `GetService` message is broadcast when the manager is created.  Every device that answers is
//! remembered and asked for its state (label, power and color).  Because all of this happens in
//! the background, the lookup methods return [Error::NotFound] until the device has answered, so
//! callers are expected to poll.

use std::time::Duration;

mod config;
mod error;
pub mod udp;

pub use config::{Config, LIFX_PORT};
pub use error::{Error, Result};
pub use lifx_core::HSBK;
pub use udp::{Bulb, Manager};

/// A single light.
pub trait Light {
	/// The device ID (the MAC address of the bulb, as reported in the frame address target)
	fn id(&self) -> u64;

	fn label(&self) -> Result<String>;

	/// `true` when the light is powered on.
	fn power(&self) -> Result<bool>;

	fn color(&self) -> Result<HSBK>;

	fn set_power(&self, on: bool) -> Result<()>;

	/// Change the color, fading over `duration`.
	fn set_color(&self, color: HSBK, duration: Duration) -> Result<()>;
}

/// A set of lights that can be queried and controlled.
pub trait Client {
	type Light: Light;

	/// All lights known so far, or [Error::NotFound] if there are none yet.
	fn lights(&self) -> Result<Vec<Self::Light>>;

	fn light_by_id(&self, id: u64) -> Result<Self::Light>;

	/// Finds the light whose label is exactly `label`.
	fn light_by_label(&self, label: &str) -> Result<Self::Light>;

	/// Power every light on the network on or off.
	fn set_power(&self, on: bool) -> Result<()>;

	/// Change the color of every light on the network.
	fn set_color(&self, color: HSBK, duration: Duration) -> Result<()>;
}

/// Power level for a LIFX `SetPower` message.
pub(crate) fn power_level(on: bool) -> u16 {
	if on {
		u16::MAX
	} else {
		0
	}
}

/// Transition time in milliseconds, as sent on the wire.
pub(crate) fn duration_millis(duration: Duration) -> u32 {
	u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
