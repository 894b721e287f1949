//! The `light` subcommands.
//!
//! Everything here is generic over [Client], so the commands can be exercised without a network.

use std::{
	io::Write,
	thread,
	time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use lifx_client::{Client, Light, HSBK};
use log::{debug, warn};

use crate::{
	cli::{LightArgs, LightCommand},
	table::Table,
};

/// How often discovery results are polled.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Calls `lookup` every [POLL_INTERVAL] until it finds something or `deadline` passes.
///
/// Only "not found" is retried; any other error is returned immediately.
pub fn poll_until<T>(
	deadline: Instant,
	mut lookup: impl FnMut() -> lifx_client::Result<T>,
) -> lifx_client::Result<T> {
	loop {
		match lookup() {
			Err(e) if e.is_not_found() => {
				let now = Instant::now();
				if now >= deadline {
					return Err(e);
				}
				thread::sleep(POLL_INTERVAL.min(deadline - now));
			}
			result => return result,
		}
	}
}

/// Collects lights for the whole `timeout`, since more of them may keep answering.
pub fn wait_for_lights<C: Client>(client: &C, timeout: Duration) -> Result<Vec<C::Light>> {
	let deadline = Instant::now() + timeout;
	let mut lights = Vec::new();
	loop {
		match client.lights() {
			Ok(found) => lights = found,
			Err(e) if e.is_not_found() => {}
			Err(e) => return Err(e).context("could not find lights"),
		}
		let now = Instant::now();
		if now >= deadline {
			break;
		}
		thread::sleep(POLL_INTERVAL.min(deadline - now));
	}

	if lights.is_empty() {
		bail!("no lights found");
	}
	Ok(lights)
}

/// Looks up the requested lights, IDs first, then labels.  An empty result means "all lights".
pub fn select_lights<C: Client>(
	client: &C,
	ids: &[u64],
	labels: &[String],
	timeout: Duration,
) -> Result<Vec<C::Light>> {
	debug!("Requested IDs: {:?}", ids);
	debug!("Requested labels: {:?}", labels);

	let deadline = Instant::now() + timeout;
	let mut lights = Vec::with_capacity(ids.len() + labels.len());
	for &id in ids {
		let light = poll_until(deadline, || client.light_by_id(id))
			.with_context(|| format!("could not find light with ID '{}'", id))?;
		lights.push(light);
	}
	for label in labels {
		let light = poll_until(deadline, || client.light_by_label(label))
			.with_context(|| format!("could not find light with label '{}'", label))?;
		lights.push(light);
	}
	Ok(lights)
}

/// Formats a color with its component names, e.g. `{Hue:0 Saturation:0 Brightness:65535 Kelvin:3500}`.
pub fn describe_color(color: &HSBK) -> String {
	format!(
		"{{Hue:{} Saturation:{} Brightness:{} Kelvin:{}}}",
		color.hue, color.saturation, color.brightness, color.kelvin
	)
}

/// Prints a table of every light that answers within `timeout`.
pub fn list<C: Client, W: Write>(client: &C, timeout: Duration, out: &mut W) -> Result<()> {
	let lights = wait_for_lights(client, timeout)?;

	let mut table = Table::new(4);
	table.row(["ID", "Label", "Power", "Color"]);

	for light in &lights {
		let id = light.id();
		let label = match light.label() {
			Ok(label) => label,
			Err(e) => {
				warn!("Couldn't get label for light {}: {}", id, e);
				continue;
			}
		};
		let power = match light.power() {
			Ok(power) => power,
			Err(e) => {
				warn!("Couldn't get power for light {}: {}", id, e);
				continue;
			}
		};
		let color = match light.color() {
			Ok(color) => color,
			Err(e) => {
				warn!("Couldn't get color for light {}: {}", id, e);
				continue;
			}
		};
		table.row([
			id.to_string(),
			label,
			power.to_string(),
			describe_color(&color),
		]);
	}

	table.write_to(out)?;
	writeln!(out)?;
	out.flush()?;
	Ok(())
}

/// Powers the selected lights on or off, or every light when the selection is empty.
pub fn power<C: Client>(client: &C, lights: &[C::Light], on: bool) -> Result<()> {
	if lights.is_empty() {
		return client.set_power(on).context("could not set power");
	}
	for light in lights {
		if let Err(e) = light.set_power(on) {
			warn!("Couldn't set power for light {}: {}", light.id(), e);
		}
	}
	Ok(())
}

/// Sets the color of the selected lights, or of every light when the selection is empty.
pub fn color<C: Client>(
	client: &C,
	lights: &[C::Light],
	color: HSBK,
	duration: Duration,
) -> Result<()> {
	if lights.is_empty() {
		return client.set_color(color, duration).context("could not set color");
	}
	for light in lights {
		if let Err(e) = light.set_color(color, duration) {
			warn!("Couldn't set color for light {}: {}", light.id(), e);
		}
	}
	Ok(())
}

/// Runs one `light` subcommand.
pub fn run<C: Client, W: Write>(
	client: &C,
	args: &LightArgs,
	timeout: Duration,
	out: &mut W,
) -> Result<()> {
	match &args.command {
		LightCommand::List => list(client, timeout, out),
		LightCommand::Power { state } => {
			let lights = select_lights(client, &args.ids, &args.labels, timeout)?;
			power(client, &lights, state.is_on())
		}
		LightCommand::Color(color_args) => {
			let hsbk = match color_args.hsbk() {
				Some(hsbk) => hsbk,
				None => bail!("missing color definition"),
			};
			let lights = select_lights(client, &args.ids, &args.labels, timeout)?;
			color(client, &lights, hsbk, color_args.duration)
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{cell::RefCell, rc::Rc};

	use lifx_client::Error;

	use super::*;
	use crate::cli::{ColorArgs, PowerState};

	type Calls = Rc<RefCell<Vec<String>>>;

	#[derive(Clone, Debug)]
	struct FakeLight {
		id: u64,
		label: Option<&'static str>,
		power: Option<bool>,
		color: Option<HSBK>,
		calls: Calls,
	}

	impl Light for FakeLight {
		fn id(&self) -> u64 {
			self.id
		}

		fn label(&self) -> lifx_client::Result<String> {
			self.label.map(str::to_owned).ok_or(Error::NoState {
				id: self.id,
				what: "label",
			})
		}

		fn power(&self) -> lifx_client::Result<bool> {
			self.power.ok_or(Error::NoState {
				id: self.id,
				what: "power",
			})
		}

		fn color(&self) -> lifx_client::Result<HSBK> {
			self.color.ok_or(Error::NoState {
				id: self.id,
				what: "color",
			})
		}

		fn set_power(&self, on: bool) -> lifx_client::Result<()> {
			self.calls.borrow_mut().push(format!("light {} power {}", self.id, on));
			Ok(())
		}

		fn set_color(&self, color: HSBK, duration: Duration) -> lifx_client::Result<()> {
			self.calls.borrow_mut().push(format!(
				"light {} color {} {:?}",
				self.id,
				describe_color(&color),
				duration
			));
			Ok(())
		}
	}

	/// Lights become visible after `hidden_polls` calls to `lights()`.
	struct FakeClient {
		lights: Vec<FakeLight>,
		hidden_polls: RefCell<usize>,
		calls: Calls,
	}

	impl FakeClient {
		fn new(lights: &[(u64, Option<&'static str>)]) -> FakeClient {
			let calls = Calls::default();
			let lights = lights
				.iter()
				.map(|&(id, label)| FakeLight {
					id,
					label,
					power: Some(id % 2 == 0),
					color: Some(HSBK {
						hue: 0,
						saturation: 0,
						brightness: 65535,
						kelvin: 3500,
					}),
					calls: calls.clone(),
				})
				.collect();
			FakeClient {
				lights,
				hidden_polls: RefCell::new(0),
				calls,
			}
		}

		fn calls(&self) -> Vec<String> {
			self.calls.borrow().clone()
		}
	}

	impl Client for FakeClient {
		type Light = FakeLight;

		fn lights(&self) -> lifx_client::Result<Vec<FakeLight>> {
			let mut hidden = self.hidden_polls.borrow_mut();
			if *hidden > 0 {
				*hidden -= 1;
				return Err(Error::NotFound);
			}
			if self.lights.is_empty() {
				return Err(Error::NotFound);
			}
			Ok(self.lights.clone())
		}

		fn light_by_id(&self, id: u64) -> lifx_client::Result<FakeLight> {
			self.lights
				.iter()
				.find(|l| l.id == id)
				.cloned()
				.ok_or(Error::NotFound)
		}

		fn light_by_label(&self, label: &str) -> lifx_client::Result<FakeLight> {
			self.lights
				.iter()
				.find(|l| l.label == Some(label))
				.cloned()
				.ok_or(Error::NotFound)
		}

		fn set_power(&self, on: bool) -> lifx_client::Result<()> {
			self.calls.borrow_mut().push(format!("all power {}", on));
			Ok(())
		}

		fn set_color(&self, color: HSBK, duration: Duration) -> lifx_client::Result<()> {
			self.calls.borrow_mut().push(format!(
				"all color {} {:?}",
				describe_color(&color),
				duration
			));
			Ok(())
		}
	}

	/// A client whose every call fails with an I/O error.
	struct BrokenClient;

	impl Client for BrokenClient {
		type Light = FakeLight;

		fn lights(&self) -> lifx_client::Result<Vec<FakeLight>> {
			Err(std::io::Error::new(std::io::ErrorKind::Other, "socket closed").into())
		}

		fn light_by_id(&self, _id: u64) -> lifx_client::Result<FakeLight> {
			self.lights().map(|_| unreachable!())
		}

		fn light_by_label(&self, _label: &str) -> lifx_client::Result<FakeLight> {
			self.lights().map(|_| unreachable!())
		}

		fn set_power(&self, _on: bool) -> lifx_client::Result<()> {
			self.lights().map(|_| ())
		}

		fn set_color(&self, _color: HSBK, _duration: Duration) -> lifx_client::Result<()> {
			self.lights().map(|_| ())
		}
	}

	const SHORT: Duration = Duration::from_millis(50);

	fn light_args(ids: &[u64], labels: &[&str], command: LightCommand) -> LightArgs {
		LightArgs {
			ids: ids.to_vec(),
			labels: labels.iter().map(|l| l.to_string()).collect(),
			command,
		}
	}

	#[test]
	fn test_poll_until_found() {
		let mut attempts = 0;
		let found = poll_until(Instant::now() + Duration::from_secs(5), || {
			attempts += 1;
			if attempts < 3 {
				Err(Error::NotFound)
			} else {
				Ok(attempts)
			}
		});
		assert_eq!(found.unwrap(), 3);
	}

	#[test]
	fn test_poll_until_deadline() {
		let started = Instant::now();
		let found: lifx_client::Result<()> = poll_until(started + SHORT, || Err(Error::NotFound));
		assert!(matches!(found, Err(Error::NotFound)));
		assert!(started.elapsed() >= SHORT);
	}

	#[test]
	fn test_poll_until_other_error() {
		let mut attempts = 0;
		let found: lifx_client::Result<()> = poll_until(Instant::now() + Duration::from_secs(5), || {
			attempts += 1;
			Err(Error::NoBroadcastAddress)
		});
		assert!(matches!(found, Err(Error::NoBroadcastAddress)));
		assert_eq!(attempts, 1);
	}

	#[test]
	fn test_wait_for_lights_waits_out_discovery() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		*client.hidden_polls.borrow_mut() = 2;
		let lights = wait_for_lights(&client, Duration::from_millis(400)).unwrap();
		assert_eq!(lights.len(), 1);
	}

	#[test]
	fn test_wait_for_lights_none() {
		let client = FakeClient::new(&[]);
		let err = wait_for_lights(&client, SHORT).unwrap_err();
		assert_eq!(err.to_string(), "no lights found");
	}

	#[test]
	fn test_wait_for_lights_error() {
		let err = wait_for_lights(&BrokenClient, SHORT).unwrap_err();
		assert_eq!(err.to_string(), "could not find lights");
	}

	#[test]
	fn test_select_by_id_and_label() {
		let client = FakeClient::new(&[(1, Some("Kitchen")), (2, Some("Hall")), (3, Some("Desk"))]);
		let lights = select_lights(&client, &[3], &["Kitchen".to_owned()], SHORT).unwrap();
		let ids: Vec<u64> = lights.iter().map(|l| l.id()).collect();
		assert_eq!(ids, vec![3, 1]);
	}

	#[test]
	fn test_select_nothing_means_all() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		assert!(select_lights(&client, &[], &[], SHORT).unwrap().is_empty());
	}

	#[test]
	fn test_select_unknown() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		let err = select_lights(&client, &[9], &[], SHORT).unwrap_err();
		assert_eq!(err.to_string(), "could not find light with ID '9'");
		let err = select_lights(&client, &[], &["Attic".to_owned()], SHORT).unwrap_err();
		assert_eq!(err.to_string(), "could not find light with label 'Attic'");
	}

	#[test]
	fn test_list() {
		let mut client = FakeClient::new(&[(1, Some("Kitchen")), (2, None), (12, Some("Hall"))]);
		client.lights[2].color = Some(HSBK {
			hue: 21845,
			saturation: 65535,
			brightness: 65535,
			kelvin: 3500,
		});
		let mut out = Vec::new();
		list(&client, SHORT, &mut out).unwrap();
		assert_eq!(
			String::from_utf8(out).unwrap(),
			"ID    Label      Power    Color\n\
			 1     Kitchen    false    {Hue:0 Saturation:0 Brightness:65535 Kelvin:3500}\n\
			 12    Hall       true     {Hue:21845 Saturation:65535 Brightness:65535 Kelvin:3500}\n\
			 \n"
		);
	}

	#[test]
	fn test_list_nothing_found() {
		let client = FakeClient::new(&[]);
		let mut out = Vec::new();
		assert!(list(&client, SHORT, &mut out).is_err());
		assert!(out.is_empty());
	}

	#[test]
	fn test_power_all() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		let args = light_args(&[], &[], LightCommand::Power { state: PowerState::Off });
		run(&client, &args, SHORT, &mut Vec::new()).unwrap();
		assert_eq!(client.calls(), vec!["all power false"]);
	}

	#[test]
	fn test_power_selected() {
		let client = FakeClient::new(&[(1, Some("Kitchen")), (2, Some("Hall"))]);
		let args = light_args(&[2], &["Kitchen"], LightCommand::Power { state: PowerState::On });
		run(&client, &args, SHORT, &mut Vec::new()).unwrap();
		assert_eq!(client.calls(), vec!["light 2 power true", "light 1 power true"]);
	}

	#[test]
	fn test_power_unknown_light_changes_nothing() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		let args = light_args(&[1], &["Attic"], LightCommand::Power { state: PowerState::On });
		assert!(run(&client, &args, SHORT, &mut Vec::new()).is_err());
		assert!(client.calls().is_empty());
	}

	#[test]
	fn test_color_selected() {
		let client = FakeClient::new(&[(1, Some("Kitchen")), (2, Some("Hall"))]);
		let args = light_args(
			&[],
			&["Hall"],
			LightCommand::Color(ColorArgs {
				hue: 100,
				saturation: 200,
				brightness: 300,
				kelvin: 4000,
				duration: Duration::from_millis(1500),
			}),
		);
		run(&client, &args, SHORT, &mut Vec::new()).unwrap();
		assert_eq!(
			client.calls(),
			vec!["light 2 color {Hue:100 Saturation:200 Brightness:300 Kelvin:4000} 1.5s"]
		);
	}

	#[test]
	fn test_color_all() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		let args = light_args(
			&[],
			&[],
			LightCommand::Color(ColorArgs {
				hue: 0,
				saturation: 0,
				brightness: 65535,
				kelvin: 2700,
				duration: Duration::ZERO,
			}),
		);
		run(&client, &args, SHORT, &mut Vec::new()).unwrap();
		assert_eq!(
			client.calls(),
			vec!["all color {Hue:0 Saturation:0 Brightness:65535 Kelvin:2700} 0ns"]
		);
	}

	#[test]
	fn test_color_missing_definition() {
		let client = FakeClient::new(&[(1, Some("Kitchen"))]);
		let args = light_args(
			&[1],
			&[],
			LightCommand::Color(ColorArgs {
				hue: 0,
				saturation: 0,
				brightness: 0,
				kelvin: 0,
				duration: Duration::from_secs(1),
			}),
		);
		let err = run(&client, &args, SHORT, &mut Vec::new()).unwrap_err();
		assert_eq!(err.to_string(), "missing color definition");
		assert!(client.calls().is_empty());
	}

	#[test]
	fn test_setter_failure_reported() {
		let err = power(&BrokenClient, &[], true).unwrap_err();
		assert_eq!(err.to_string(), "could not set power");
	}
}
