//! JSON-RPC 2.0 envelopes exchanged with the on-device agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code the agent uses when a selector resolves to nothing.
pub const NOT_FOUND_CODE: i64 = -32002;

/// Base of the implementation-defined server error range.
pub const SERVER_ERROR_BASE: i64 = -32000;

/// Exception type name reported alongside [`NOT_FOUND_CODE`].
pub const NOT_FOUND_EXCEPTION: &str = "UiObjectNotFoundException";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	pub jsonrpc: String,
	pub method: String,
	pub params: Vec<Value>,
	pub id: u64,
}

impl Request {
	pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
		Self {
			jsonrpc: "2.0".to_string(),
			method: method.into(),
			params,
			id,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	#[serde(default)]
	pub jsonrpc: Option<String>,
	#[serde(default)]
	pub id: Option<Value>,
	#[serde(default)]
	pub result: Option<Value>,
	#[serde(default)]
	pub error: Option<ErrorObject>,
}

impl Response {
	/// Splits the envelope into its result or error. A missing `result`
	/// without an `error` is treated as `null`.
	pub fn into_result(self) -> Result<Value, ErrorObject> {
		match self.error {
			Some(err) => Err(err),
			None => Ok(self.result.unwrap_or(Value::Null)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
	pub code: i64,
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl ErrorObject {
	/// Java exception type the agent attached, when present.
	pub fn exception_type(&self) -> Option<&str> {
		self.data.as_ref()?.get("exceptionTypeName")?.as_str()
	}

	pub fn is_not_found(&self) -> bool {
		self.code == NOT_FOUND_CODE || self.exception_type().is_some_and(|t| t.ends_with(NOT_FOUND_EXCEPTION))
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_shape() {
		let req = Request::new(7, "click", vec![json!(10), json!(20)]);
		assert_eq!(
			serde_json::to_value(&req).unwrap(),
			json!({"jsonrpc": "2.0", "method": "click", "params": [10, 20], "id": 7})
		);
	}

	#[test]
	fn response_result_and_error() {
		let ok: Response = serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": "pong"})).unwrap();
		assert_eq!(ok.into_result(), Ok(json!("pong")));

		let empty: Response = serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap();
		assert_eq!(empty.into_result(), Ok(Value::Null));

		let err: Response = serde_json::from_value(json!({
			"jsonrpc": "2.0", "id": 1,
			"error": {"code": -32001, "message": "boom", "data": {"exceptionTypeName": "com.android.uiautomator.core.UiObjectNotFoundException"}}
		}))
		.unwrap();
		let err = err.into_result().unwrap_err();
		assert!(err.is_not_found());
		assert_eq!(err.exception_type(), Some("com.android.uiautomator.core.UiObjectNotFoundException"));
	}

	#[test]
	fn not_found_by_code() {
		let err = ErrorObject { code: NOT_FOUND_CODE, message: String::new(), data: None };
		assert!(err.is_not_found());
		let other = ErrorObject { code: SERVER_ERROR_BASE, message: "x".into(), data: Some(json!("plain")) };
		assert!(!other.is_not_found());
	}
}
