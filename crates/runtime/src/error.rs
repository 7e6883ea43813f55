//! Error types for the uia runtime.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use uia_protocol::{ErrorObject, SelectorError};

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the device bridge or the on-device agent.
#[derive(Debug, Error)]
pub enum Error {
	/// The bridge executable failed or could not be run.
	#[error("Bridge error: {0}")]
	Bridge(String),

	/// No attached device matches the request.
	#[error("Device not found: {0}")]
	DeviceNotFound(String),

	/// More than one device is attached and none was selected.
	#[error("Multiple devices attached ({}); pick one with a serial", .0.join(", "))]
	MultipleDevices(Vec<String>),

	/// The agent never answered within the establishment budget.
	#[error("Failed to connect to agent on {serial} after {attempts} attempts: {reason}")]
	ConnectionFailed { serial: String, attempts: u32, reason: String },

	/// The installed agent does not match the expected build, even after a reinstall.
	#[error("Agent version mismatch: expected {expected}, found {}", found.as_deref().unwrap_or("nothing"))]
	VersionMismatch { expected: String, found: Option<String> },

	/// Failure reported by the agent, kept verbatim.
	#[error("JSON-RPC error {code}: {message}")]
	Rpc { code: i64, message: String, data: Option<Value> },

	/// A selector resolved to no element.
	#[error("Element not found: {0}")]
	ElementNotFound(String),

	/// A call exceeded its timeout.
	#[error("Timeout after {timeout_ms}ms waiting for '{method}'")]
	Timeout { method: String, timeout_ms: u64 },

	/// A call could not reach the agent at all.
	#[error("Transport error: {0}")]
	Transport(String),

	/// Agent packages are needed for install but could not be located.
	#[error("Agent packages not found (searched {})", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
	AgentPackageNotFound(Vec<PathBuf>),

	/// Every local port in the range is taken.
	#[error("No free local port in {start}..={end}")]
	PortsExhausted { start: u16, end: u16 },

	/// Invalid argument provided to a method.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// The device platform does not support the operation.
	#[error("Unsupported: {0}")]
	Unsupported(String),

	#[error("Invalid selector: {0}")]
	Selector(#[from] SelectorError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}

	/// Returns true if a selector or agent-side name resolved to nothing.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::ElementNotFound(_))
	}

	/// Returns true for failures raised while bringing a session up.
	pub fn is_establishment(&self) -> bool {
		matches!(
			self,
			Error::Bridge(_)
				| Error::DeviceNotFound(_)
				| Error::MultipleDevices(_)
				| Error::ConnectionFailed { .. }
				| Error::VersionMismatch { .. }
				| Error::AgentPackageNotFound(_)
				| Error::PortsExhausted { .. }
		)
	}

	/// Returns true when the call never reached the agent.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, Error::Transport(_) | Error::ConnectionFailed { .. })
	}

	/// Maps a JSON-RPC error object to [`Error::ElementNotFound`] or [`Error::Rpc`].
	pub fn from_rpc(err: ErrorObject) -> Self {
		if err.is_not_found() {
			return Error::ElementNotFound(err.message);
		}
		Error::Rpc {
			code: err.code,
			message: err.message,
			data: err.data,
		}
	}
}
