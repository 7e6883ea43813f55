//! Structured output envelope for all CLI commands.
//!
//! Every command produces one result envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "count",
//!   "data": 3,
//!   "timings": { "durationMs": 412 }
//! }
//! ```
//!
//! On failure `data` is replaced by `error: { code, message, details }` and
//! the process exits with status 1.

#[cfg(test)]
mod tests;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bumped on breaking changes to the envelope.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Pretty-printed JSON envelope
	Json,
	/// One JSON envelope per line
	Ndjson,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"text" => Ok(OutputFormat::Text),
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
		}
	}
}

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	pub ok: bool,

	/// Command name (e.g. "click", "screenshot")
	pub command: String,

	/// Device the command ran against, when one was resolved
	#[serde(skip_serializing_if = "Option::is_none")]
	pub serial: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	pub message: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Value>,
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// No device, or more than one without `--serial`
	DeviceNotFound,
	/// adb failed or is missing
	BridgeError,
	/// The agent could not be started or reached
	ConnectionFailed,
	/// The installed agent build is not the expected one
	VersionMismatch,
	/// No element matched the selector
	ElementNotFound,
	Timeout,
	/// The agent reported a failure
	RpcError,
	/// The device does not support the operation
	Unsupported,
	InvalidInput,
	IoError,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::DeviceNotFound => write!(f, "DEVICE_NOT_FOUND"),
			ErrorCode::BridgeError => write!(f, "BRIDGE_ERROR"),
			ErrorCode::ConnectionFailed => write!(f, "CONNECTION_FAILED"),
			ErrorCode::VersionMismatch => write!(f, "VERSION_MISMATCH"),
			ErrorCode::ElementNotFound => write!(f, "ELEMENT_NOT_FOUND"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::RpcError => write!(f, "RPC_ERROR"),
			ErrorCode::Unsupported => write!(f, "UNSUPPORTED"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// Builder for command results.
pub struct ResultBuilder<T: Serialize> {
	command: String,
	serial: Option<String>,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self::started(command, Instant::now())
	}

	/// Builder whose timing starts at `start_time`.
	pub fn started(command: impl Into<String>, start_time: Instant) -> Self {
		Self {
			command: command.into(),
			serial: None,
			data: None,
			error: None,
			start_time,
		}
	}

	pub fn serial(mut self, serial: Option<String>) -> Self {
		self.serial = serial;
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok,
			command: self.command,
			serial: self.serial,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
		}
	}
}

/// Prints a result to stdout in `format`.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			if let Some(data) = result.data.as_ref().and_then(|d| serde_json::to_value(d).ok()) {
				let mut stdout = io::stdout().lock();
				let _ = stdout.write_all(render_text(&data).as_bytes());
			}
		}
	}
}

/// Plain-text rendering of command data.
///
/// Strings print verbatim, arrays one item per line, objects as
/// `key: value` lines; `null` prints nothing.
pub fn render_text(data: &Value) -> String {
	fn scalar(value: &Value) -> String {
		match value {
			Value::String(s) => s.clone(),
			Value::Null => String::new(),
			other => other.to_string(),
		}
	}

	let mut out = String::new();
	match data {
		Value::Null => {}
		Value::Array(items) => {
			for item in items {
				out.push_str(&scalar(item));
				out.push('\n');
			}
		}
		Value::Object(map) => {
			let width = map.keys().map(String::len).max().unwrap_or(0);
			for (key, value) in map {
				out.push_str(&format!("{key:width$}  {}\n", scalar(value)));
			}
		}
		other => {
			let text = scalar(other);
			out.push_str(&text);
			if !text.ends_with('\n') {
				out.push('\n');
			}
		}
	}
	out
}

/// Prints an error to stderr for humans.
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "error".red().bold(), error.code, error.message);
}
