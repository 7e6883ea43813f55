//! In-memory doubles for the bridge and the agent.
//!
//! [`FakeBridge`] records every bridge call and simulates forwards, package
//! installs and remote files. [`FakeAgent`] is a [`Transport`] that answers
//! JSON-RPC calls from registered responders. Linking them with
//! [`FakeBridge::with_agent`] makes "starting the instrumentation" bring the
//! agent up, so the whole session lifecycle runs without a device.
//!
//! # Example
//!
//! ```ignore
//! let agent = FakeAgent::new();
//! let bridge = Arc::new(FakeBridge::new(&["emulator-5554"]).with_agent(agent.clone()));
//! agent.respond("deviceInfo", |_| Ok(json!({"displayWidth": 1080, "displayHeight": 1920, "displayRotation": 0})));
//! let manager = SessionManager::with_parts(Config::default(), bridge, agent, ports);
//! ```

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use uia_protocol::{ErrorObject, Request, Response, SERVER_ERROR_BASE};

use crate::bridge::{Bridge, DeviceEntry, ForwardEntry, ForwardSpec, ProcessHandle, ShellOutput};
use crate::channel::{Endpoint, Transport};
use crate::config::AGENT_VERSION;
use crate::error::{Error, Result};

type Responder = Arc<dyn Fn(&[Value]) -> std::result::Result<Value, ErrorObject> + Send + Sync>;

/// Scriptable stand-in for the on-device agent.
#[derive(Default)]
pub struct FakeAgent {
	alive: AtomicBool,
	responders: Mutex<HashMap<String, Responder>>,
	requests: Mutex<Vec<Request>>,
	pages: Mutex<HashMap<String, Vec<u8>>>,
	gets: Mutex<Vec<String>>,
	transport_failures: Mutex<VecDeque<String>>,
}

impl FakeAgent {
	/// An agent that is not running yet.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// An agent that already answers.
	pub fn running() -> Arc<Self> {
		let agent = Self::new();
		agent.set_alive(true);
		agent
	}

	pub fn set_alive(&self, alive: bool) {
		self.alive.store(alive, Ordering::SeqCst);
	}

	pub fn is_alive(&self) -> bool {
		self.alive.load(Ordering::SeqCst)
	}

	/// Registers the responder for `method`, replacing any previous one.
	pub fn respond<F>(&self, method: &str, f: F)
	where
		F: Fn(&[Value]) -> std::result::Result<Value, ErrorObject> + Send + Sync + 'static,
	{
		self.responders.lock().insert(method.to_string(), Arc::new(f));
	}

	/// Registers a constant reply for `method`.
	pub fn respond_value(&self, method: &str, value: Value) {
		self.respond(method, move |_| Ok(value.clone()));
	}

	/// Body served for `GET path` (query string ignored).
	pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
		self.pages.lock().insert(path.to_string(), body.into());
	}

	/// Makes the next call to `method` fail as if the connection dropped.
	pub fn fail_transport_once(&self, method: &str) {
		self.transport_failures.lock().push_back(method.to_string());
	}

	/// Every request received, pings included.
	pub fn requests(&self) -> Vec<Request> {
		self.requests.lock().clone()
	}

	/// Params of every call to `method`, in order.
	pub fn calls(&self, method: &str) -> Vec<Vec<Value>> {
		self.requests
			.lock()
			.iter()
			.filter(|r| r.method == method)
			.map(|r| r.params.clone())
			.collect()
	}

	pub fn call_count(&self, method: &str) -> usize {
		self.requests.lock().iter().filter(|r| r.method == method).count()
	}

	/// Paths requested with `GET`, query strings included.
	pub fn gets(&self) -> Vec<String> {
		self.gets.lock().clone()
	}

	fn take_failure(&self, method: &str) -> bool {
		let mut failures = self.transport_failures.lock();
		match failures.iter().position(|m| m == method) {
			Some(i) => {
				failures.remove(i);
				true
			}
			None => false,
		}
	}
}

impl std::fmt::Debug for FakeAgent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FakeAgent").field("alive", &self.is_alive()).finish_non_exhaustive()
	}
}

impl Transport for FakeAgent {
	fn rpc(&self, _endpoint: &Endpoint, request: &Request, _timeout: Duration) -> Result<Response> {
		if !self.is_alive() {
			return Err(Error::Transport("connection refused".into()));
		}
		if self.take_failure(&request.method) {
			return Err(Error::Transport("connection reset".into()));
		}
		self.requests.lock().push(request.clone());

		let responder = self.responders.lock().get(&request.method).cloned();
		let outcome = match responder {
			Some(f) => f(&request.params),
			None if request.method == "ping" => Ok(json!("pong")),
			None => Err(ErrorObject {
				code: -32601,
				message: format!("Method not found: {}", request.method),
				data: None,
			}),
		};

		let (result, error) = match outcome {
			Ok(value) => (Some(value), None),
			Err(err) => (None, Some(err)),
		};
		Ok(Response {
			jsonrpc: Some("2.0".into()),
			id: Some(json!(request.id)),
			result,
			error,
		})
	}

	fn get(&self, _endpoint: &Endpoint, path: &str, _timeout: Duration) -> Result<Vec<u8>> {
		if !self.is_alive() {
			return Err(Error::Transport("connection refused".into()));
		}
		self.gets.lock().push(path.to_string());

		let route = path.split('?').next().unwrap_or(path);
		if route == "/stop" {
			self.set_alive(false);
			return Ok(b"Server stopped!".to_vec());
		}
		self.pages.lock().get(route).cloned().ok_or_else(|| Error::Rpc {
			code: SERVER_ERROR_BASE,
			message: format!("GET {path} returned 404 Not Found"),
			data: None,
		})
	}
}

/// A recorded bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
	Devices,
	Forward { serial: String, local: u16, remote: u16 },
	RemoveForward { serial: String, local: u16 },
	ForwardList,
	Push { serial: String, local: PathBuf, remote: String },
	Pull { serial: String, remote: String, local: PathBuf },
	Shell { serial: String, args: Vec<String> },
	Spawn { serial: String, args: Vec<String> },
}

/// Scriptable stand-in for `adb`.
#[derive(Debug)]
pub struct FakeBridge {
	devices: Mutex<Vec<DeviceEntry>>,
	forwards: Mutex<Vec<ForwardEntry>>,
	installed: Mutex<Option<String>>,
	install_yields: Mutex<String>,
	remote_files: Mutex<HashMap<String, Vec<u8>>>,
	calls: Mutex<Vec<BridgeCall>>,
	starts: AtomicUsize,
	kills: Arc<AtomicUsize>,
	start_delay: Mutex<Duration>,
	agent: Option<Arc<FakeAgent>>,
}

impl FakeBridge {
	/// Online devices with the expected agent build already installed.
	pub fn new(serials: &[&str]) -> Self {
		Self {
			devices: Mutex::new(
				serials
					.iter()
					.map(|s| DeviceEntry {
						serial: s.to_string(),
						state: "device".into(),
					})
					.collect(),
			),
			forwards: Mutex::new(Vec::new()),
			installed: Mutex::new(Some(AGENT_VERSION.to_string())),
			install_yields: Mutex::new(AGENT_VERSION.to_string()),
			remote_files: Mutex::new(HashMap::new()),
			calls: Mutex::new(Vec::new()),
			starts: AtomicUsize::new(0),
			kills: Arc::new(AtomicUsize::new(0)),
			start_delay: Mutex::new(Duration::ZERO),
			agent: None,
		}
	}

	/// Starting instrumentation brings `agent` up; killing it takes it down.
	pub fn with_agent(mut self, agent: Arc<FakeAgent>) -> Self {
		self.agent = Some(agent);
		self
	}

	pub fn set_installed(&self, version: Option<&str>) {
		*self.installed.lock() = version.map(String::from);
	}

	/// Version reported after `pm install`.
	pub fn set_install_yields(&self, version: &str) {
		*self.install_yields.lock() = version.to_string();
	}

	pub fn set_start_delay(&self, delay: Duration) {
		*self.start_delay.lock() = delay;
	}

	pub fn add_forward(&self, serial: &str, local: u16, remote: u16) {
		self.forwards.lock().push(ForwardEntry {
			serial: serial.to_string(),
			spec: ForwardSpec { local, remote },
		});
	}

	pub fn add_remote_file(&self, path: &str, content: impl Into<Vec<u8>>) {
		self.remote_files.lock().insert(path.to_string(), content.into());
	}

	pub fn has_remote_file(&self, path: &str) -> bool {
		self.remote_files.lock().contains_key(path)
	}

	pub fn calls(&self) -> Vec<BridgeCall> {
		self.calls.lock().clone()
	}

	/// Number of agent starts so far.
	pub fn starts(&self) -> usize {
		self.starts.load(Ordering::SeqCst)
	}

	/// Number of agent processes killed so far.
	pub fn kills(&self) -> usize {
		self.kills.load(Ordering::SeqCst)
	}

	pub fn forwards(&self) -> Vec<ForwardEntry> {
		self.forwards.lock().clone()
	}

	/// Shell calls whose first argument is `program`.
	pub fn shell_calls(&self, program: &str) -> Vec<Vec<String>> {
		self.calls
			.lock()
			.iter()
			.filter_map(|c| match c {
				BridgeCall::Shell { args, .. } if args.first().is_some_and(|a| a == program) => Some(args.clone()),
				_ => None,
			})
			.collect()
	}

	fn record(&self, call: BridgeCall) {
		self.calls.lock().push(call);
	}
}

fn owned(args: &[&str]) -> Vec<String> {
	args.iter().map(|a| a.to_string()).collect()
}

impl Bridge for FakeBridge {
	fn devices(&self) -> Result<Vec<DeviceEntry>> {
		self.record(BridgeCall::Devices);
		Ok(self.devices.lock().clone())
	}

	fn forward(&self, serial: &str, local: u16, remote: u16) -> Result<()> {
		self.record(BridgeCall::Forward {
			serial: serial.to_string(),
			local,
			remote,
		});
		let mut forwards = self.forwards.lock();
		forwards.retain(|f| f.spec.local != local);
		forwards.push(ForwardEntry {
			serial: serial.to_string(),
			spec: ForwardSpec { local, remote },
		});
		Ok(())
	}

	fn remove_forward(&self, serial: &str, local: u16) -> Result<()> {
		self.record(BridgeCall::RemoveForward {
			serial: serial.to_string(),
			local,
		});
		self.forwards.lock().retain(|f| !(f.serial == serial && f.spec.local == local));
		Ok(())
	}

	fn forward_list(&self) -> Result<Vec<ForwardEntry>> {
		self.record(BridgeCall::ForwardList);
		Ok(self.forwards.lock().clone())
	}

	fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()> {
		self.record(BridgeCall::Push {
			serial: serial.to_string(),
			local: local.to_path_buf(),
			remote: remote.to_string(),
		});
		self.remote_files.lock().insert(remote.to_string(), Vec::new());
		Ok(())
	}

	fn pull(&self, serial: &str, remote: &str, local: &Path) -> Result<()> {
		self.record(BridgeCall::Pull {
			serial: serial.to_string(),
			remote: remote.to_string(),
			local: local.to_path_buf(),
		});
		let content = self
			.remote_files
			.lock()
			.get(remote)
			.cloned()
			.ok_or_else(|| Error::Bridge(format!("adb pull {remote} failed: remote object does not exist")))?;
		std::fs::write(local, content)?;
		Ok(())
	}

	fn shell(&self, serial: &str, args: &[&str]) -> Result<ShellOutput> {
		self.record(BridgeCall::Shell {
			serial: serial.to_string(),
			args: owned(args),
		});
		let stdout = match args {
			["dumpsys", "package", ..] => match &*self.installed.lock() {
				Some(v) => format!("Packages:\n    versionName={v}\n"),
				None => String::new(),
			},
			["pm", "install", ..] => {
				*self.installed.lock() = Some(self.install_yields.lock().clone());
				"Success\n".to_string()
			}
			["rm", path, ..] => {
				self.remote_files.lock().remove(*path);
				String::new()
			}
			_ => String::new(),
		};
		Ok(ShellOutput {
			stdout,
			stderr: String::new(),
			status: Some(0),
		})
	}

	fn spawn(&self, serial: &str, args: &[&str]) -> Result<Box<dyn ProcessHandle>> {
		self.record(BridgeCall::Spawn {
			serial: serial.to_string(),
			args: owned(args),
		});
		let id = self.starts.fetch_add(1, Ordering::SeqCst) as u32 + 1;
		let delay = *self.start_delay.lock();
		if !delay.is_zero() {
			std::thread::sleep(delay);
		}
		if let Some(agent) = &self.agent {
			agent.set_alive(true);
		}
		Ok(Box::new(FakeProcess {
			id,
			running: true,
			agent: self.agent.clone(),
			kills: Arc::clone(&self.kills),
		}))
	}
}

/// Process handle returned by [`FakeBridge::spawn`].
#[derive(Debug)]
pub struct FakeProcess {
	id: u32,
	running: bool,
	agent: Option<Arc<FakeAgent>>,
	kills: Arc<AtomicUsize>,
}

impl ProcessHandle for FakeProcess {
	fn id(&self) -> Option<u32> {
		Some(self.id)
	}

	fn is_running(&mut self) -> bool {
		self.running
	}

	fn kill(&mut self) -> Result<()> {
		self.running = false;
		self.kills.fetch_add(1, Ordering::SeqCst);
		if let Some(agent) = &self.agent {
			agent.set_alive(false);
		}
		Ok(())
	}
}
