use serde_json::json;
use thiserror::Error;
use uia_protocol::SelectorError;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error(transparent)]
	Selector(#[from] SelectorError),

	#[error(transparent)]
	Uia(#[from] uia::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

/// Maps a library error to an output code and optional details.
fn classify(err: &uia::Error) -> (ErrorCode, Option<serde_json::Value>) {
	use uia::Error as E;

	match err {
		E::DeviceNotFound(serial) => (ErrorCode::DeviceNotFound, Some(json!({ "serial": serial }))),
		E::MultipleDevices(serials) => (ErrorCode::DeviceNotFound, Some(json!({ "candidates": serials }))),
		E::Bridge(_) | E::PortsExhausted { .. } => (ErrorCode::BridgeError, None),
		E::ConnectionFailed { serial, attempts, .. } => (
			ErrorCode::ConnectionFailed,
			Some(json!({ "serial": serial, "attempts": attempts })),
		),
		E::Transport(_) => (ErrorCode::ConnectionFailed, None),
		E::VersionMismatch { expected, found } => (
			ErrorCode::VersionMismatch,
			Some(json!({ "expected": expected, "found": found })),
		),
		E::AgentPackageNotFound(paths) => (ErrorCode::VersionMismatch, Some(json!({ "searched": paths }))),
		E::ElementNotFound(_) => (ErrorCode::ElementNotFound, None),
		E::Timeout { method, timeout_ms } => (
			ErrorCode::Timeout,
			Some(json!({ "method": method, "timeoutMs": timeout_ms })),
		),
		E::Rpc { code, data, .. } => (ErrorCode::RpcError, Some(json!({ "code": code, "data": data }))),
		E::Unsupported(_) => (ErrorCode::Unsupported, None),
		E::InvalidArgument(_) | E::Selector(_) => (ErrorCode::InvalidInput, None),
		E::Io(_) => (ErrorCode::IoError, None),
		E::Json(_) => (ErrorCode::InternalError, None),
	}
}

impl CliError {
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::InvalidInput(_) | CliError::Selector(_) => (ErrorCode::InvalidInput, None),
			CliError::Uia(err) => classify(err),
			CliError::Io(_) => (ErrorCode::IoError, None),
			CliError::Json(_) | CliError::Anyhow(_) => (ErrorCode::InternalError, None),
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}
