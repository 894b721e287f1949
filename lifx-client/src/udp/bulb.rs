use std::{
	net::SocketAddr,
	sync::Arc,
	time::{Duration, Instant},
};
use lifx_core::{Message, HSBK};
use log::{debug, trace};

use crate::{
	duration_millis,
	power_level,
	udp::{Refreshable, Shared},
	Error,
	Light,
	Result,
};

/// Everything we know about a device that has answered us.
pub struct BulbState {
	pub addr: SocketAddr,
	/// When we last asked the device for its state.
	pub last_query: Option<Instant>,
	pub label: Refreshable<String>,
	pub power: Refreshable<bool>,
	pub color: Refreshable<HSBK>,
}

impl BulbState {
	pub fn new(addr: SocketAddr, max_age: Duration) -> BulbState {
		BulbState {
			addr,
			last_query: None,
			label: Refreshable::empty(max_age),
			power: Refreshable::empty(max_age),
			color: Refreshable::empty(max_age),
		}
	}

	/// Devices can change address, so replies go to wherever we last heard from.
	pub fn seen(&mut self, addr: SocketAddr) {
		self.addr = addr;
	}

	/// Whether a `LightGet` should be sent, given that queries are spaced at least `interval`
	/// apart.
	pub fn needs_query(&self, interval: Duration) -> bool {
		let stale = self.label.needs_refresh() || self.power.needs_refresh() || self.color.needs_refresh();
		stale && self.last_query.map_or(true, |at| at.elapsed() >= interval)
	}

	/// Folds a message received from this device into the cached state.
	pub fn handle_message(&mut self, msg: Message) {
		match msg {
			Message::StateService { port, .. } => {
				if port == 0 {
					debug!("{} reports its service as temporarily unavailable", self.addr);
				}
			}
			Message::LightState {
				color,
				power,
				label,
				..
			} => {
				self.color.update(color);
				self.power.update(power as u16 != 0);
				self.label.update(label.to_string());
			}
			Message::StateLabel { label } => self.label.update(label.to_string()),
			Message::StatePower { level } => self.power.update(level as u16 != 0),
			Message::LightStatePower { level } => self.power.update(level != 0),
			unknown => trace!("Received, but ignored {:?}", unknown),
		}
	}
}

/// Handle to a single device known to a [crate::Manager].
///
/// The handle reads from the manager's cache, so it keeps seeing updates for as long as the
/// manager's receiver is running.
#[derive(Clone)]
pub struct Bulb {
	id: u64,
	shared: Arc<Shared>,
}

impl Bulb {
	pub(crate) fn new(id: u64, shared: Arc<Shared>) -> Bulb {
		Bulb { id, shared }
	}

	pub fn addr(&self) -> Result<SocketAddr> {
		self.shared.with_bulb(self.id, |b| Ok(b.addr))
	}

	fn cached<T: Clone>(
		&self,
		what: &'static str,
		field: impl FnOnce(&BulbState) -> &Refreshable<T>,
	) -> Result<T> {
		let id = self.id;
		self.shared.with_bulb(id, |b| {
			field(b).as_ref().cloned().ok_or(Error::NoState { id, what })
		})
	}

	fn send(&self, message: Message) -> Result<()> {
		let addr = self.addr()?;
		self.shared.send(Some(self.id), message, addr)
	}
}

impl Light for Bulb {
	fn id(&self) -> u64 {
		self.id
	}

	fn label(&self) -> Result<String> {
		self.cached("label", |b| &b.label)
	}

	fn power(&self) -> Result<bool> {
		self.cached("power", |b| &b.power)
	}

	fn color(&self) -> Result<HSBK> {
		self.cached("color", |b| &b.color)
	}

	fn set_power(&self, on: bool) -> Result<()> {
		debug!("Setting power of {:016X} to {}", self.id, on);
		self.send(Message::LightSetPower {
			level: power_level(on),
			duration: 0,
		})
	}

	fn set_color(&self, color: HSBK, duration: Duration) -> Result<()> {
		debug!("Setting color of {:016X} to {:?} over {:?}", self.id, color, duration);
		self.send(Message::LightSetColor {
			reserved: 0,
			color,
			duration: duration_millis(duration),
		})
	}
}
