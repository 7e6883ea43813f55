//! Argument definitions.


use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use uia_protocol::KeyPress;

use crate::output::OutputFormat;
use crate::selector_args::SelectorArgs;
use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "uia")]
#[command(about = "Android UI automation from the command line")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Device serial (defaults to ANDROID_SERIAL, then the only attached device)
	#[arg(short, long, global = true, value_name = "SERIAL")]
	pub serial: Option<String>,

	/// Local port forwarded to the agent
	#[arg(long, global = true, value_name = "PORT")]
	pub port: Option<u16>,

	/// Default RPC timeout in seconds
	#[arg(long, global = true, value_name = "SECS")]
	pub timeout: Option<u64>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List attached devices
	Devices,

	/// Show device information
	Info {
		/// Print a single field (wire name, or `width`/`height`)
		#[arg(long, value_name = "NAME")]
		field: Option<String>,
	},

	/// Dump the window hierarchy as XML
	Dump {
		/// Also write the raw XML to this file
		#[arg(short, long, value_name = "FILE")]
		output: Option<PathBuf>,
		/// Keep layout-only nodes
		#[arg(long)]
		no_compress: bool,
		/// Print the XML as returned, without re-indenting
		#[arg(long)]
		raw: bool,
	},

	/// Capture the screen
	#[command(alias = "ss")]
	Screenshot {
		/// Destination file
		file: PathBuf,
		/// Scale factor (0..1]
		#[arg(long, default_value_t = 1.0)]
		scale: f32,
		/// Encoder quality (0-100)
		#[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
		quality: u8,
	},

	/// Press a key by name (home, back, volume_up, ...) or key code
	Press {
		key: KeyPress,
		/// Meta state for a key code
		#[arg(long, value_name = "META")]
		meta: Option<i32>,
	},

	/// Tap at screen coordinates
	Tap { x: i32, y: i32 },

	/// Click the element matching the selector
	Click(SelectorArgs),

	/// Check whether an element matches (exit code stays 0 either way)
	Exists(SelectorArgs),

	/// Count matching elements
	Count(SelectorArgs),

	/// Read or replace the text of an element
	Text {
		#[command(flatten)]
		target: SelectorArgs,
		/// Replace the text (empty clears the field)
		#[arg(long, value_name = "TEXT")]
		set: Option<String>,
	},

	/// Show or set the display orientation
	Orientation {
		/// natural/n/0, left/l/90, upsidedown/u/180, right/r/270
		value: Option<String>,
		/// Freeze (true) or release (false) rotation after setting
		#[arg(long, value_name = "BOOL")]
		freeze: Option<bool>,
	},

	/// Show or set the screen state
	Screen { state: Option<ScreenArg> },

	/// Wait for the device to settle
	#[command(subcommand)]
	Wait(WaitAction),

	/// Manage agent-side watchers
	#[command(subcommand)]
	Watchers(WatchersAction),

	/// Stop the agent and remove the port forward
	Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScreenArg {
	On,
	Off,
}

#[derive(Subcommand, Debug)]
pub enum WaitAction {
	/// Wait for the foreground app to go idle
	Idle {
		/// Maximum wait in milliseconds
		#[arg(long, default_value_t = 10_000, value_name = "MS")]
		ms: u64,
	},
	/// Wait for a window content update
	Update {
		/// Only count updates from this package
		#[arg(long, value_name = "PACKAGE")]
		package: Option<String>,
		/// Maximum wait in milliseconds
		#[arg(long, default_value_t = 1_000, value_name = "MS")]
		ms: u64,
	},
}

#[derive(Subcommand, Debug)]
pub enum WatchersAction {
	/// List registered watchers
	List,
	/// Remove one watcher, or all with --all
	Remove {
		#[arg(required_unless_present = "all")]
		name: Option<String>,
		#[arg(long, conflicts_with = "name")]
		all: bool,
	},
	/// Clear triggered flags
	Reset,
	/// Evaluate all watchers now
	Run,
	/// Report whether any watcher has triggered
	Triggered,
}
