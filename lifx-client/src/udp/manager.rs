use std::{
	collections::HashMap,
	io::ErrorKind,
	net::{IpAddr, SocketAddr, UdpSocket},
	sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
	thread,
	time::{Duration, Instant},
};
use get_if_addrs::{get_if_addrs, IfAddr, Ifv4Addr};
use lifx_core::{BuildOptions, Message, RawMessage, HSBK};
use log::{debug, error, info, trace};

use crate::{
	duration_millis,
	power_level,
	udp::{Bulb, BulbState},
	Client,
	Config,
	Error,
	Result,
};

/// Frame + frame address + protocol header
const HEADER_SIZE: usize = 36;

/// How often the receiver checks whether its manager has gone away.
const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// State shared between the [Manager], its receiver thread and every [Bulb] handle.
pub(crate) struct Shared {
	sock: UdpSocket,
	source: u32,
	refresh_interval: Duration,
	max_age: Duration,
	bulbs: Mutex<HashMap<u64, BulbState>>,
}

impl Shared {
	pub(crate) fn bulbs(&self) -> MutexGuard<'_, HashMap<u64, BulbState>> {
		// the map is only a cache, so a panic elsewhere doesn't make it unusable
		self.bulbs.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub(crate) fn with_bulb<T>(
		&self,
		id: u64,
		f: impl FnOnce(&BulbState) -> Result<T>,
	) -> Result<T> {
		match self.bulbs().get(&id) {
			Some(bulb) => f(bulb),
			None => Err(Error::NotFound),
		}
	}

	pub(crate) fn send(&self, target: Option<u64>, message: Message, addr: SocketAddr) -> Result<()> {
		let options = BuildOptions {
			target,
			res_required: target.is_some(),
			source: self.source,
			..Default::default()
		};
		let bytes = RawMessage::build(&options, message)
			.and_then(|raw| raw.pack())
			.map_err(Error::protocol)?;
		self.sock.send_to(&bytes, addr)?;
		Ok(())
	}

	/// Handles one datagram received from `addr`.
	fn receive(&self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
		let size = match bytes {
			[lo, hi, ..] => usize::from(u16::from_le_bytes([*lo, *hi])),
			_ => 0,
		};
		if bytes.len() < HEADER_SIZE || size != bytes.len() {
			return Err(Error::Protocol(format!(
				"datagram of {} bytes with frame size {}",
				bytes.len(),
				size
			)));
		}

		let raw = RawMessage::unpack(bytes).map_err(Error::protocol)?;
		let target = raw.frame_addr.target;
		if target == 0 {
			// our own broadcasts, or another client's
			return Ok(());
		}
		if raw.frame.source != 0 && raw.frame.source != self.source {
			trace!("Ignoring reply from {} meant for source {:08X}", addr, raw.frame.source);
			return Ok(());
		}
		// devices also send undocumented messages; those still tell us the device exists
		let message = Message::from_raw(&raw);

		let query = {
			let mut bulbs = self.bulbs();
			let bulb = bulbs
				.entry(target)
				.and_modify(|bulb| bulb.seen(addr))
				.or_insert_with(|| {
					info!("Discovered {:016X} at {}", target, addr);
					BulbState::new(addr, self.max_age)
				});
			if let Ok(message) = &message {
				bulb.handle_message(message.clone());
			}
			if bulb.needs_query(self.refresh_interval) {
				bulb.last_query = Some(Instant::now());
				Some(bulb.addr)
			} else {
				None
			}
		};

		if let Some(addr) = query {
			self.send(Some(target), Message::LightGet, addr)?;
		}
		message.map(|_| ()).map_err(Error::protocol)
	}
}

/// A [Client] that talks to the LAN over UDP.
///
/// Creating a manager binds a socket, starts a receiver thread and broadcasts a discovery
/// message.  The receiver stops shortly after the manager and all of its [Bulb]s are dropped.
pub struct Manager {
	shared: Arc<Shared>,
	broadcast: Vec<SocketAddr>,
}

impl Manager {
	pub fn new(config: Config) -> Result<Manager> {
		let broadcast = if config.broadcast.is_empty() {
			interface_broadcasts(config.port)?
		} else {
			config.broadcast.clone()
		};
		if broadcast.is_empty() {
			return Err(Error::NoBroadcastAddress);
		}

		let sock = UdpSocket::bind(config.bind)?;
		sock.set_broadcast(true)?;
		sock.set_read_timeout(Some(RECV_TIMEOUT))?;
		debug!("Listening on {}", sock.local_addr()?);

		let recv_sock = sock.try_clone()?;
		let shared = Arc::new(Shared {
			sock,
			source: config.source,
			refresh_interval: config.refresh_interval,
			max_age: config.max_age,
			bulbs: Mutex::new(HashMap::new()),
		});

		let receiver = Arc::downgrade(&shared);
		thread::Builder::new()
			.name("lifx-receiver".into())
			.spawn(move || Self::worker(recv_sock, receiver))?;

		let mgr = Manager { shared, broadcast };
		mgr.discover()?;

		Ok(mgr)
	}

	fn worker(recv_sock: UdpSocket, shared: Weak<Shared>) {
		let mut buf = [0; 1024];
		loop {
			let (nbytes, addr) = match recv_sock.recv_from(&mut buf) {
				Ok(received) => received,
				Err(e) if matches!(
					e.kind(),
					ErrorKind::WouldBlock
						| ErrorKind::TimedOut
						| ErrorKind::Interrupted
						| ErrorKind::ConnectionReset
				) => {
					if shared.strong_count() == 0 {
						return;
					}
					continue;
				}
				Err(e) => {
					error!("recv_from failed, no more replies will be processed: {}", e);
					return;
				}
			};
			let shared = match shared.upgrade() {
				Some(shared) => shared,
				None => return,
			};
			if let Some(bytes) = buf.get(..nbytes) {
				if let Err(e) = shared.receive(bytes, addr) {
					debug!("Error handling message from {}: {}", addr, e);
				}
			}
		}
	}

	/// Broadcasts a `GetService` message; every device that answers becomes known.
	pub fn discover(&self) -> Result<()> {
		debug!("Doing discovery");
		self.broadcast(Message::GetService)
	}

	/// Asks every known device whose state is missing or stale for its current state.
	pub fn refresh(&self) -> Result<()> {
		let due: Vec<(u64, SocketAddr)> = {
			let mut bulbs = self.shared.bulbs();
			bulbs
				.iter_mut()
				.filter(|(_, bulb)| bulb.needs_query(self.shared.refresh_interval))
				.map(|(&id, bulb)| {
					bulb.last_query = Some(Instant::now());
					(id, bulb.addr)
				})
				.collect()
		};
		for (id, addr) in due {
			trace!("Refreshing {:016X}", id);
			self.shared.send(Some(id), Message::LightGet, addr)?;
		}
		Ok(())
	}

	fn broadcast(&self, message: Message) -> Result<()> {
		for addr in &self.broadcast {
			trace!("Broadcasting {:?} to {}", message, addr);
			self.shared.send(None, message.clone(), *addr)?;
		}
		Ok(())
	}

	fn handle(&self, id: u64) -> Bulb {
		Bulb::new(id, Arc::clone(&self.shared))
	}
}

impl Client for Manager {
	type Light = Bulb;

	fn lights(&self) -> Result<Vec<Bulb>> {
		self.refresh()?;
		let mut ids: Vec<u64> = self.shared.bulbs().keys().copied().collect();
		if ids.is_empty() {
			return Err(Error::NotFound);
		}
		ids.sort_unstable();
		Ok(ids.into_iter().map(|id| self.handle(id)).collect())
	}

	fn light_by_id(&self, id: u64) -> Result<Bulb> {
		self.refresh()?;
		if self.shared.bulbs().contains_key(&id) {
			Ok(self.handle(id))
		} else {
			Err(Error::NotFound)
		}
	}

	fn light_by_label(&self, label: &str) -> Result<Bulb> {
		self.refresh()?;
		let found = self
			.shared
			.bulbs()
			.iter()
			.filter(|(_, bulb)| bulb.label.as_ref().map(String::as_str) == Some(label))
			.map(|(&id, _)| id)
			.min();
		found.map(|id| self.handle(id)).ok_or(Error::NotFound)
	}

	fn set_power(&self, on: bool) -> Result<()> {
		debug!("Setting power of all lights to {}", on);
		self.broadcast(Message::LightSetPower {
			level: power_level(on),
			duration: 0,
		})
	}

	fn set_color(&self, color: HSBK, duration: Duration) -> Result<()> {
		debug!("Setting color of all lights to {:?} over {:?}", color, duration);
		self.broadcast(Message::LightSetColor {
			reserved: 0,
			color,
			duration: duration_millis(duration),
		})
	}
}

/// The broadcast address of every non-loopback IPv4 interface.
pub fn interface_broadcasts(port: u16) -> Result<Vec<SocketAddr>> {
	let mut addrs = Vec::new();
	for iface in get_if_addrs()? {
		if iface.ip().is_loopback() {
			continue;
		}
		if let IfAddr::V4(Ifv4Addr {
			broadcast: Some(bcast),
			..
		}) = iface.addr
		{
			let addr = SocketAddr::new(IpAddr::V4(bcast), port);
			debug!("Discovering bulbs on LAN {} ({})", addr, iface.name);
			addrs.push(addr);
		}
	}
	Ok(addrs)
}
