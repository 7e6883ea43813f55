//! JSON-RPC channel to the on-device agent.
//!
//! [`Transport`] moves single requests over some medium; [`HttpTransport`] is
//! the real one. [`RpcChannel`] binds a transport to one forwarded endpoint,
//! assigns request ids, applies the timeout policy, and turns agent errors
//! into [`Error`] values.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use uia_protocol::{Request, Response, SERVER_ERROR_BASE};

use crate::error::{Error, Result};

/// Grace added on top of an operation's own timeout.
pub const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Network address of a forwarded agent port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
	pub host: String,
	pub port: u16,
}

impl Endpoint {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self { host: host.into(), port }
	}

	pub fn url(&self, path: &str) -> String {
		format!("http://{}:{}{}", self.host, self.port, path)
	}

	pub fn rpc_url(&self) -> String {
		self.url("/jsonrpc/0")
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.host, self.port)
	}
}

/// Carries one request to the agent and returns its raw reply.
///
/// Implementations return [`Error::Transport`] when the request could not be
/// delivered and [`Error::Timeout`] when no reply arrived in time.
pub trait Transport: Send + Sync {
	fn rpc(&self, endpoint: &Endpoint, request: &Request, timeout: Duration) -> Result<Response>;

	/// Plain `GET` against the agent's HTTP server, returning the body.
	fn get(&self, endpoint: &Endpoint, path: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// [`Transport`] over HTTP with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::blocking::Client,
}

impl HttpTransport {
	pub fn new() -> Result<Self> {
		let client = reqwest::blocking::Client::builder()
			.no_proxy()
			.build()
			.map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
		Ok(Self { client })
	}
}

fn map_http_error(err: reqwest::Error, what: &str, timeout: Duration) -> Error {
	if err.is_timeout() {
		return Error::Timeout {
			method: what.to_string(),
			timeout_ms: timeout.as_millis() as u64,
		};
	}
	if err.is_decode() {
		return Error::Rpc {
			code: SERVER_ERROR_BASE,
			message: format!("malformed reply to '{what}': {err}"),
			data: None,
		};
	}
	Error::Transport(err.to_string())
}

impl Transport for HttpTransport {
	fn rpc(&self, endpoint: &Endpoint, request: &Request, timeout: Duration) -> Result<Response> {
		self.client
			.post(endpoint.rpc_url())
			.json(request)
			.timeout(timeout)
			.send()
			.and_then(|resp| resp.json::<Response>())
			.map_err(|e| map_http_error(e, &request.method, timeout))
	}

	fn get(&self, endpoint: &Endpoint, path: &str, timeout: Duration) -> Result<Vec<u8>> {
		let resp = self
			.client
			.get(endpoint.url(path))
			.timeout(timeout)
			.send()
			.map_err(|e| map_http_error(e, path, timeout))?;
		let status = resp.status();
		if !status.is_success() {
			return Err(Error::Rpc {
				code: SERVER_ERROR_BASE,
				message: format!("GET {path} returned {status}"),
				data: None,
			});
		}
		resp.bytes()
			.map(|b| b.to_vec())
			.map_err(|e| map_http_error(e, path, timeout))
	}
}

/// Effective timeout for an operation that carries its own wait.
pub fn operation_timeout(default: Duration, op: Duration) -> Duration {
	default.max(op + TIMEOUT_GRACE)
}

/// A ready connection to one agent.
pub struct RpcChannel {
	endpoint: Endpoint,
	transport: Arc<dyn Transport>,
	default_timeout: Duration,
	next_id: AtomicU64,
}

impl fmt::Debug for RpcChannel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RpcChannel")
			.field("endpoint", &self.endpoint)
			.field("default_timeout", &self.default_timeout)
			.finish_non_exhaustive()
	}
}

impl RpcChannel {
	pub fn new(endpoint: Endpoint, transport: Arc<dyn Transport>, default_timeout: Duration) -> Self {
		Self {
			endpoint,
			transport,
			default_timeout,
			next_id: AtomicU64::new(1),
		}
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.endpoint
	}

	pub fn default_timeout(&self) -> Duration {
		self.default_timeout
	}

	/// Calls `method` with the default timeout.
	pub fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
		self.send(method, params, self.default_timeout)
	}

	/// Calls `method` for an operation that waits up to `op` on the device.
	pub fn call_with_timeout(&self, method: &str, params: Vec<Value>, op: Duration) -> Result<Value> {
		self.send(method, params, operation_timeout(self.default_timeout, op))
	}

	/// Calls `method` and deserializes the result.
	pub fn call_as<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
		Ok(serde_json::from_value(self.call(method, params)?)?)
	}

	/// Liveness probe: true when the agent answers `ping` with `pong`.
	pub fn ping(&self, timeout: Duration) -> Result<bool> {
		let reply = self.send("ping", Vec::new(), timeout)?;
		Ok(reply.as_str() == Some("pong"))
	}

	/// `GET` a non-RPC path on the agent, e.g. `/screenshot/0`.
	pub fn fetch(&self, path: &str, timeout: Duration) -> Result<Vec<u8>> {
		debug!(target = "uia", endpoint = %self.endpoint, path, "agent GET");
		self.transport.get(&self.endpoint, path, timeout)
	}

	fn send(&self, method: &str, params: Vec<Value>, timeout: Duration) -> Result<Value> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request = Request::new(id, method, params);
		debug!(target = "uia", endpoint = %self.endpoint, id, method, timeout_ms = timeout.as_millis() as u64, "rpc call");

		let response = self.transport.rpc(&self.endpoint, &request, timeout)?;
		response.into_result().map_err(Error::from_rpc)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use uia_protocol::{ErrorObject, NOT_FOUND_CODE};

	use super::*;
	use crate::testing::FakeAgent;

	fn channel(agent: &Arc<FakeAgent>) -> RpcChannel {
		RpcChannel::new(Endpoint::new("127.0.0.1", 9008), agent.clone(), Duration::from_secs(90))
	}

	#[test]
	fn timeout_policy() {
		let default = Duration::from_secs(90);
		assert_eq!(operation_timeout(default, Duration::from_secs(3)), default);
		assert_eq!(operation_timeout(default, Duration::from_secs(100)), Duration::from_secs(105));
		assert_eq!(operation_timeout(Duration::from_secs(1), Duration::from_millis(500)), Duration::from_millis(5500));
	}

	#[test]
	fn call_returns_result() {
		let agent = FakeAgent::running();
		agent.respond("deviceInfo", |_| Ok(json!({"displayWidth": 1080})));
		let result = channel(&agent).call("deviceInfo", vec![]).unwrap();
		assert_eq!(result["displayWidth"], 1080);
	}

	#[test]
	fn not_found_error_is_typed() {
		let agent = FakeAgent::running();
		agent.respond("click", |_| {
			Err(ErrorObject {
				code: NOT_FOUND_CODE,
				message: "UiSelector[TEXT=Missing]".into(),
				data: None,
			})
		});
		let err = channel(&agent).call("click", vec![json!({"text": "Missing"})]).unwrap_err();
		assert!(err.is_not_found());
	}

	#[test]
	fn ping_checks_answer() {
		let agent = FakeAgent::running();
		assert!(channel(&agent).ping(Duration::from_secs(1)).unwrap());

		agent.set_alive(false);
		assert!(channel(&agent).ping(Duration::from_secs(1)).unwrap_err().is_unreachable());
	}

	#[test]
	fn request_ids_increase() {
		let agent = FakeAgent::running();
		agent.respond("noop", |_| Ok(Value::Null));
		let ch = channel(&agent);
		ch.call("noop", vec![]).unwrap();
		ch.call("noop", vec![]).unwrap();
		let ids: Vec<u64> = agent.requests().iter().map(|r| r.id).collect();
		assert_eq!(ids, vec![1, 2]);
	}

	#[test]
	fn endpoint_urls() {
		let ep = Endpoint::new("localhost", 9010);
		assert_eq!(ep.rpc_url(), "http://localhost:9010/jsonrpc/0");
		assert_eq!(ep.url("/stop"), "http://localhost:9010/stop");
	}
}
