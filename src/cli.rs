use std::{net::SocketAddr, time::Duration};

use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use lifx_client::{Config, HSBK};

use crate::duration;

#[derive(Debug, Parser)]
#[command(name = "lifx", version, about = "Discover and control LIFX lights on your local network")]
pub struct Cli {
	/// How long to wait for lights to answer, e.g. 500ms, 2s or 1m30s
	#[arg(
		short,
		long,
		global = true,
		env = "LIFX_TIMEOUT",
		default_value = "2s",
		value_parser = duration::parse
	)]
	pub timeout: Duration,

	/// Log level (off, error, warn, info, debug, trace); RUST_LOG takes precedence
	#[arg(long, global = true, env = "LIFX_LOG_LEVEL", default_value = "info")]
	pub log_level: log::LevelFilter,

	/// Local address to listen on
	#[arg(long, global = true)]
	pub bind: Option<SocketAddr>,

	/// Broadcast address(es) used for discovery, comma-separated.  Defaults to the broadcast
	/// address of every local IPv4 interface
	#[arg(long, global = true, value_delimiter = ',')]
	pub broadcast: Vec<SocketAddr>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Interact with lights
	#[command(long_about = "Interact with lights.\n\
		Acts on all lights by default, however you may restrict the lights that a command applies \
		to by specifying IDs or labels via the flags listed below.")]
	Light(LightArgs),
}

#[derive(Debug, Args)]
pub struct LightArgs {
	/// ID of the light(s) to manage, comma-separated.  Defaults to all lights
	#[arg(short = 'i', long = "id", global = true, value_delimiter = ',', value_parser = parse_id)]
	pub ids: Vec<u64>,

	/// Label of the light(s) to manage, comma-separated.  Defaults to all lights
	#[arg(short = 'l', long = "label", global = true, value_delimiter = ',')]
	pub labels: Vec<String>,

	#[command(subcommand)]
	pub command: LightCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightCommand {
	/// List available lights
	List,
	/// Set light color
	Color(ColorArgs),
	/// Turn lights [on|off]
	Power {
		#[arg(value_enum)]
		state: PowerState,
	},
}

#[derive(Debug, Args)]
pub struct ColorArgs {
	/// Hue component of the HSBK color (0-65535)
	#[arg(short = 'H', long, default_value_t = 0)]
	pub hue: u16,

	/// Saturation component of the HSBK color (0-65535)
	#[arg(short = 'S', long, default_value_t = 0)]
	pub saturation: u16,

	/// Brightness component of the HSBK color (0-65535)
	#[arg(short = 'B', long, default_value_t = 0)]
	pub brightness: u16,

	/// Kelvin component of the HSBK color, the color temperature of whites (2500-9000)
	#[arg(short = 'K', long, default_value_t = 0)]
	pub kelvin: u16,

	/// Duration of the color transition
	#[arg(short, long, default_value = "0", value_parser = duration::parse)]
	pub duration: Duration,
}

impl ColorArgs {
	/// The requested color, or `None` if no component was given.
	pub fn hsbk(&self) -> Option<HSBK> {
		if self.hue == 0 && self.saturation == 0 && self.brightness == 0 && self.kelvin == 0 {
			return None;
		}
		Some(HSBK {
			hue: self.hue,
			saturation: self.saturation,
			brightness: self.brightness,
			kelvin: self.kelvin,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
	On,
	Off,
}

impl PowerState {
	pub fn is_on(self) -> bool {
		self == PowerState::On
	}
}

/// Device IDs are accepted in decimal, or in hex with a `0x` prefix.
pub fn parse_id(s: &str) -> Result<u64, String> {
	let s = s.trim();
	let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => u64::from_str_radix(hex, 16),
		None => s.parse(),
	};
	parsed.map_err(|e| format!("invalid light ID `{}`: {}", s, e))
}

impl Cli {
	/// Checks that clap can't express.  The error prints usage for the offending subcommand.
	pub fn validate(&self) -> Result<(), clap::Error> {
		match &self.command {
			Command::Light(LightArgs {
				command: LightCommand::Color(color),
				..
			}) if color.hsbk().is_none() => {
				const MESSAGE: &str = "missing color definition: give at least one of --hue, \
					--saturation, --brightness or --kelvin";
				let mut cmd = Cli::command();
				cmd.build();
				let err = match cmd
					.find_subcommand_mut("light")
					.and_then(|light| light.find_subcommand_mut("color"))
				{
					Some(color) => color.error(ErrorKind::MissingRequiredArgument, MESSAGE),
					None => Cli::command().error(ErrorKind::MissingRequiredArgument, MESSAGE),
				};
				Err(err)
			}
			_ => Ok(()),
		}
	}

	pub fn client_config(&self) -> Config {
		let mut config = Config {
			broadcast: self.broadcast.clone(),
			..Default::default()
		};
		if let Some(bind) = self.bind {
			config.bind = bind;
		}
		config
	}
}
