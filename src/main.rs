use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use lifx::{
	cli::{Cli, Command},
	light,
};
use lifx_client::Manager;
use log::debug;

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.log_level)
		.parse_default_env()
		.init();

	if let Err(e) = cli.validate() {
		e.exit();
	}

	let config = cli.client_config();
	debug!("Client config: {:?}", config);
	let client = Manager::new(config).context("could not start the LIFX client")?;

	match &cli.command {
		Command::Light(args) => light::run(&client, args, cli.timeout, &mut io::stdout().lock()),
	}
}
