//! Command dispatch.
//!
//! Each command returns JSON data for the output envelope. Inputs are
//! validated before any device connection is made, so bad arguments fail
//! fast even without adb.

mod device;
mod element;
mod watchers;

use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;
use uia::{Config, Device};
use uia_runtime::{Adb, Bridge};

use crate::cli::{Cli, Commands};
use crate::error::Result;

/// Successful command output.
#[derive(Debug)]
pub struct Outcome {
	pub serial: Option<String>,
	pub data: Value,
}

/// Name used in the output envelope.
pub fn name(command: &Commands) -> &'static str {
	match command {
		Commands::Devices => "devices",
		Commands::Info { .. } => "info",
		Commands::Dump { .. } => "dump",
		Commands::Screenshot { .. } => "screenshot",
		Commands::Press { .. } => "press",
		Commands::Tap { .. } => "tap",
		Commands::Click(_) => "click",
		Commands::Exists(_) => "exists",
		Commands::Count(_) => "count",
		Commands::Text { .. } => "text",
		Commands::Orientation { .. } => "orientation",
		Commands::Screen { .. } => "screen",
		Commands::Wait(_) => "wait",
		Commands::Watchers(_) => "watchers",
		Commands::Stop => "stop",
	}
}

/// Environment configuration with the global flags applied on top.
pub fn config(cli: &Cli) -> Result<Config> {
	let mut config = Config::from_env()?;
	if let Some(serial) = &cli.serial {
		config = config.serial(serial.clone());
	}
	if let Some(port) = cli.port {
		config = config.local_port(port);
	}
	if let Some(secs) = cli.timeout {
		config = config.rpc_timeout(Duration::from_secs(secs));
	}
	Ok(config)
}

fn connect(config: Config) -> Result<Device> {
	let device = Device::connect(config)?;
	debug!(target = "uia_cli", serial = device.serial(), "device selected");
	Ok(device)
}

pub fn run(cli: &Cli) -> Result<Outcome> {
	let config = config(cli)?;

	if let Commands::Devices = cli.command {
		return devices(&config);
	}

	// Parse everything that can be rejected locally before touching the device.
	let plan = Plan::new(&cli.command)?;
	let device = connect(config)?;
	let data = plan.execute(&device)?;
	Ok(Outcome {
		serial: Some(device.serial().to_string()),
		data,
	})
}

fn devices(config: &Config) -> Result<Outcome> {
	let adb = Adb::from_config(config)?;
	let rows: Vec<Value> = adb
		.devices()?
		.into_iter()
		.map(|d| json!({ "serial": d.serial, "state": d.state }))
		.collect();
	Ok(Outcome {
		serial: None,
		data: Value::Array(rows),
	})
}

/// A validated command waiting for a device.
enum Plan<'a> {
	Device(device::DeviceCommand<'a>),
	Element(element::ElementCommand<'a>),
	Watchers(&'a crate::cli::WatchersAction),
}

impl<'a> Plan<'a> {
	fn new(command: &'a Commands) -> Result<Self> {
		if let Some(cmd) = element::ElementCommand::parse(command)? {
			return Ok(Plan::Element(cmd));
		}
		if let Commands::Watchers(action) = command {
			return Ok(Plan::Watchers(action));
		}
		Ok(Plan::Device(device::DeviceCommand::parse(command)?))
	}

	fn execute(self, device: &Device) -> Result<Value> {
		match self {
			Plan::Device(cmd) => cmd.execute(device),
			Plan::Element(cmd) => cmd.execute(device),
			Plan::Watchers(action) => watchers::execute(device, action),
		}
	}
}
