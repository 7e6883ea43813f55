//! Agent session management.
//!
//! A [`SessionManager`] owns, per device serial, the forwarded local port, the
//! instrumentation process and a ready [`RpcChannel`]. Callers ask for a
//! channel with [`SessionManager::ensure_ready`]; the manager reuses a live
//! session or brings the agent up (forward, version check, install, start,
//! poll) under a per-serial lock. Different serials never block each other.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::agent::{self, AgentPackage};
use crate::bridge::{self, Adb, Bridge, ProcessHandle};
use crate::channel::{Endpoint, HttpTransport, RpcChannel, Transport};
use crate::config::{Config, DEVICE_PORT};
use crate::error::{Error, Result};
use crate::ports::PortAllocator;


/// Whether a session may be handed out without re-establishing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
	Ready,
	Stale,
}

/// Snapshot of one device's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
	pub serial: String,
	pub local_port: u16,
	/// Agent version read during establishment; `None` when an already running
	/// agent was adopted without a check.
	pub version: Option<String>,
	pub process_id: Option<u32>,
	pub state: Liveness,
}

struct AgentSession {
	local_port: u16,
	process: Option<Box<dyn ProcessHandle>>,
	version: Option<String>,
	channel: Arc<RpcChannel>,
	state: Liveness,
}

#[derive(Default)]
struct Slot {
	session: Option<AgentSession>,
}

/// Coordinates agent sessions for any number of devices.
pub struct SessionManager {
	config: Config,
	bridge: Arc<dyn Bridge>,
	transport: Arc<dyn Transport>,
	ports: PortAllocator,
	slots: DashMap<String, Arc<Mutex<Slot>>>,
}

impl std::fmt::Debug for SessionManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionManager")
			.field("config", &self.config)
			.field("ports", &self.ports)
			.field("devices", &self.slots.len())
			.finish_non_exhaustive()
	}
}

impl SessionManager {
	/// Real bridge (`adb`), HTTP transport, and the default port range.
	pub fn new(config: Config) -> Result<Self> {
		let bridge = Arc::new(Adb::from_config(&config)?);
		let transport = Arc::new(HttpTransport::new()?);
		let ports = PortAllocator::new(config.forward_host());
		Ok(Self::with_parts(config, bridge, transport, ports))
	}

	pub fn with_parts(config: Config, bridge: Arc<dyn Bridge>, transport: Arc<dyn Transport>, ports: PortAllocator) -> Self {
		Self {
			config,
			bridge,
			transport,
			ports,
			slots: DashMap::new(),
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn bridge(&self) -> &Arc<dyn Bridge> {
		&self.bridge
	}

	/// Picks a device: `requested`, then the configured serial, then the only
	/// attached device.
	pub fn resolve_serial(&self, requested: Option<&str>) -> Result<String> {
		bridge::resolve_serial(self.bridge.as_ref(), requested.or(self.config.serial.as_deref()))
	}

	fn slot(&self, serial: &str) -> Arc<Mutex<Slot>> {
		Arc::clone(self.slots.entry(serial.to_string()).or_default().value())
	}

	/// Returns a ready channel to the agent on `serial`.
	///
	/// A `Ready` session is handed out without a round-trip; callers that see
	/// [`Error::Transport`] on it should [`invalidate`](Self::invalidate) and
	/// ask again. `port_hint` pins the local port; a ready session on another
	/// port is replaced.
	pub fn ensure_ready(&self, serial: &str, port_hint: Option<u16>) -> Result<Arc<RpcChannel>> {
		let slot = self.slot(serial);
		let mut slot = slot.lock();

		if let Some(session) = &slot.session {
			let port_ok = port_hint.is_none_or(|p| p == session.local_port);
			if session.state == Liveness::Ready && port_ok {
				return Ok(session.channel.clone());
			}
		}

		self.establish(serial, port_hint, &mut slot)
	}

	fn establish(&self, serial: &str, port_hint: Option<u16>, slot: &mut Slot) -> Result<Arc<RpcChannel>> {
		let previous = slot.session.take();
		let previous_port = previous.as_ref().map(|s| s.local_port);
		let mut previous_process = previous.and_then(|s| s.process);

		let result = self.bring_up(serial, port_hint, previous_port, &mut previous_process, slot);
		// Only left over when bring-up failed before starting a new agent.
		if let Some(process) = previous_process.take() {
			kill(serial, process, "failed to kill previous agent process");
		}
		result
	}

	fn bring_up(
		&self,
		serial: &str,
		port_hint: Option<u16>,
		previous_port: Option<u16>,
		previous_process: &mut Option<Box<dyn ProcessHandle>>,
		slot: &mut Slot,
	) -> Result<Arc<RpcChannel>> {
		let forwarded: Vec<u16> = self
			.bridge
			.forward_list()?
			.into_iter()
			.filter(|f| f.serial == serial && f.spec.remote == DEVICE_PORT)
			.map(|f| f.spec.local)
			.collect();
		let existing_forward = forwarded.first().copied();

		let port = match port_hint.or(previous_port).or(existing_forward) {
			Some(port) => port,
			None => self.ports.allocate()?,
		};
		info!(target = "uia", serial, port, "establishing agent session");

		let stale: BTreeSet<u16> = previous_port.into_iter().chain(forwarded.iter().copied()).filter(|&p| p != port).collect();
		for old in stale {
			debug!(target = "uia", serial, port = old, "removing stale forward");
			if let Err(e) = self.bridge.remove_forward(serial, old) {
				warn!(target = "uia", serial, port = old, error = %e, "failed to remove stale forward");
			}
		}

		let channel = Arc::new(RpcChannel::new(
			Endpoint::new(self.config.forward_host(), port),
			self.transport.clone(),
			self.config.rpc_timeout,
		));

		if previous_port == Some(port) || forwarded.contains(&port) {
			if let Ok(true) = channel.ping(self.config.probe_timeout) {
				info!(target = "uia", serial, port, "agent already running");
				slot.session = Some(AgentSession {
					local_port: port,
					process: previous_process.take(),
					version: None,
					channel: channel.clone(),
					state: Liveness::Ready,
				});
				return Ok(channel);
			}
		}

		self.bridge.forward(serial, port, DEVICE_PORT)?;
		let version = self.ensure_installed(serial)?;

		if let Some(process) = previous_process.take() {
			kill(serial, process, "failed to kill previous agent process");
		}
		let process = agent::start(self.bridge.as_ref(), serial)?;

		let retry = self.config.retry;
		let mut reason = String::from("no attempt made");
		for attempt in 0..retry.attempts {
			match channel.ping(self.config.probe_timeout) {
				Ok(true) => {
					info!(target = "uia", serial, port, attempt, version = %version, "agent ready");
					slot.session = Some(AgentSession {
						local_port: port,
						process: Some(process),
						version: Some(version),
						channel: channel.clone(),
						state: Liveness::Ready,
					});
					return Ok(channel);
				}
				Ok(false) => reason = "unexpected reply to ping".to_string(),
				Err(e) => reason = e.to_string(),
			}
			debug!(target = "uia", serial, attempt, reason = %reason, "agent not ready yet");
			if attempt + 1 < retry.attempts {
				thread::sleep(retry.backoff(attempt));
			}
		}

		kill(serial, process, "failed to kill unresponsive agent");
		Err(Error::ConnectionFailed {
			serial: serial.to_string(),
			attempts: retry.attempts,
			reason,
		})
	}

	/// Makes sure the expected agent build is installed, returning its version.
	fn ensure_installed(&self, serial: &str) -> Result<String> {
		let expected = &self.config.agent.version;
		let found = agent::installed_version(self.bridge.as_ref(), serial)?;
		if found.as_deref() == Some(expected.as_str()) {
			return Ok(expected.clone());
		}

		info!(target = "uia", serial, expected = %expected, found = ?found, "installing agent");
		let package = AgentPackage::locate(&self.config.agent)?;
		agent::install(self.bridge.as_ref(), serial, &package)?;

		match agent::installed_version(self.bridge.as_ref(), serial)? {
			Some(v) if v == *expected => Ok(v),
			found => Err(Error::VersionMismatch {
				expected: expected.clone(),
				found,
			}),
		}
	}

	/// Marks the session stale so the next [`ensure_ready`](Self::ensure_ready)
	/// re-establishes it.
	pub fn invalidate(&self, serial: &str) {
		let Some(slot) = self.slots.get(serial).map(|s| Arc::clone(s.value())) else {
			return;
		};
		if let Some(session) = slot.lock().session.as_mut() {
			debug!(target = "uia", serial, "session invalidated");
			session.state = Liveness::Stale;
		}
	}

	/// Stops the agent, removes the forward, and forgets the session.
	pub fn stop(&self, serial: &str) -> Result<()> {
		let Some(slot) = self.slots.get(serial).map(|s| Arc::clone(s.value())) else {
			return Ok(());
		};
		let Some(mut session) = slot.lock().session.take() else {
			return Ok(());
		};

		info!(target = "uia", serial, port = session.local_port, "stopping agent");
		if let Err(e) = session.channel.fetch("/stop", self.config.probe_timeout) {
			debug!(target = "uia", serial, error = %e, "agent did not acknowledge stop");
		}
		if let Some(process) = session.process.take() {
			kill(serial, process, "failed to kill agent process");
		}
		self.bridge.remove_forward(serial, session.local_port)
	}

	pub fn session_info(&self, serial: &str) -> Option<SessionInfo> {
		let slot = self.slots.get(serial).map(|s| Arc::clone(s.value()))?;
		let slot = slot.lock();
		let session = slot.session.as_ref()?;
		Some(SessionInfo {
			serial: serial.to_string(),
			local_port: session.local_port,
			version: session.version.clone(),
			process_id: session.process.as_ref().and_then(|p| p.id()),
			state: session.state,
		})
	}
}

fn kill(serial: &str, mut process: Box<dyn ProcessHandle>, failure: &str) {
	if let Err(e) = process.kill() {
		warn!(target = "uia", serial, error = %e, "{failure}");
	}
}
