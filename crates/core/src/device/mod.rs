//! Device facade.
//!
//! A [`Device`] addresses one Android device through a shared
//! [`SessionManager`]. Every method is a blocking round-trip to the agent;
//! the session is (re)established on demand.

mod dump;
mod screen;
mod screenshot;
mod watcher;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use uia_protocol::{DeviceInfo, KeyPress, Orientation, Point, Selector};
use uia_runtime::{Config, Error, Result, RpcChannel, SessionManager};

pub use dump::{DumpOptions, pretty_xml};
pub use screen::{Screen, ScreenState};
pub use watcher::{Watcher, Watchers};

use crate::handlers::{HandlerRegistry, Handlers};
use crate::object::UiObject;

/// Default number of steps for swipes and drags (about 5ms each).
pub const DEFAULT_STEPS: u32 = 100;

struct DeviceInner {
	serial: String,
	port_hint: Option<u16>,
	manager: Arc<SessionManager>,
	handlers: HandlerRegistry,
}

/// One Android device. Cheap to clone; clones share handlers and session.
#[derive(Clone)]
pub struct Device {
	inner: Arc<DeviceInner>,
}

impl std::fmt::Debug for Device {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Device")
			.field("serial", &self.inner.serial)
			.field("port_hint", &self.inner.port_hint)
			.finish_non_exhaustive()
	}
}

impl Device {
	/// Connects with the real bridge, choosing the device from `config`.
	///
	/// The agent itself is started lazily by the first call.
	pub fn connect(config: Config) -> Result<Self> {
		let manager = Arc::new(SessionManager::new(config)?);
		let serial = manager.resolve_serial(None)?;
		Ok(Self::with_manager(manager, serial))
	}

	/// Builds a device on an existing manager, e.g. one shared by several devices.
	pub fn with_manager(manager: Arc<SessionManager>, serial: impl Into<String>) -> Self {
		let port_hint = manager.config().local_port;
		Self {
			inner: Arc::new(DeviceInner {
				serial: serial.into(),
				port_hint,
				manager,
				handlers: HandlerRegistry::default(),
			}),
		}
	}

	pub fn serial(&self) -> &str {
		&self.inner.serial
	}

	pub fn manager(&self) -> &Arc<SessionManager> {
		&self.inner.manager
	}

	pub(crate) fn handler_registry(&self) -> &HandlerRegistry {
		&self.inner.handlers
	}

	/// Ready channel for this device, establishing the session if needed.
	pub fn channel(&self) -> Result<Arc<RpcChannel>> {
		self.inner.manager.ensure_ready(&self.inner.serial, self.inner.port_hint)
	}

	/// Raw JSON-RPC call with the default timeout.
	pub fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
		self.invoke(method, params, None)
	}

	/// Raw JSON-RPC call for an operation that waits up to `op` on the device.
	pub fn call_with_timeout(&self, method: &str, params: Vec<Value>, op: Duration) -> Result<Value> {
		self.invoke(method, params, Some(op))
	}

	/// Raw JSON-RPC call, deserializing the result.
	pub fn call_as<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T> {
		Ok(serde_json::from_value(self.call(method, params)?)?)
	}

	fn invoke(&self, method: &str, params: Vec<Value>, op: Option<Duration>) -> Result<Value> {
		match self.send(method, &params, op) {
			Err(err) if err.is_not_found() && self.inner.handlers.run(self) => {
				debug!(target = "uia", serial = self.serial(), method, "handler requested retry");
				self.send(method, &params, op)
			}
			other => other,
		}
	}

	fn send(&self, method: &str, params: &[Value], op: Option<Duration>) -> Result<Value> {
		let dispatch = |channel: &RpcChannel| match op {
			Some(op) => channel.call_with_timeout(method, params.to_vec(), op),
			None => channel.call(method, params.to_vec()),
		};

		match dispatch(self.channel()?.as_ref()) {
			Err(Error::Transport(reason)) => {
				warn!(target = "uia", serial = self.serial(), method, reason = %reason, "agent unreachable, re-establishing");
				self.inner.manager.invalidate(&self.inner.serial);
				dispatch(self.channel()?.as_ref())
			}
			other => other,
		}
	}

	/// Shuts the agent down and removes the forward.
	pub fn stop(&self) -> Result<()> {
		self.inner.manager.stop(&self.inner.serial)
	}

	// Device information

	pub fn info(&self) -> Result<DeviceInfo> {
		self.call_as("deviceInfo", vec![])
	}

	/// One `deviceInfo` field by wire name or alias (`width`, `height`).
	pub fn info_value(&self, name: &str) -> Result<Value> {
		self.info()?
			.lookup(name)
			.ok_or_else(|| Error::InvalidArgument(format!("unknown device info field '{name}'")))
	}

	// Coordinates

	pub fn click(&self, x: i32, y: i32) -> Result<bool> {
		self.call_as("click", vec![json!(x), json!(y)])
	}

	/// Long press at a point, done as a one-pixel swipe.
	pub fn long_click(&self, x: i32, y: i32) -> Result<bool> {
		self.swipe(x, y, x + 1, y + 1, DEFAULT_STEPS)
	}

	pub fn swipe(&self, sx: i32, sy: i32, ex: i32, ey: i32, steps: u32) -> Result<bool> {
		self.call_as("swipe", vec![json!(sx), json!(sy), json!(ex), json!(ey), json!(steps)])
	}

	/// Swipe through a sequence of points.
	pub fn swipe_points(&self, points: &[Point], steps: u32) -> Result<bool> {
		let flat: Vec<i32> = points.iter().flat_map(|p| [p.x, p.y]).collect();
		self.call_as("swipePoints", vec![json!(flat), json!(steps)])
	}

	pub fn drag(&self, sx: i32, sy: i32, ex: i32, ey: i32, steps: u32) -> Result<bool> {
		self.call_as("drag", vec![json!(sx), json!(sy), json!(ex), json!(ey), json!(steps)])
	}

	// Orientation

	pub fn freeze_rotation(&self, freeze: bool) -> Result<()> {
		self.call("freezeRotation", vec![json!(freeze)]).map(drop)
	}

	pub fn orientation(&self) -> Result<Orientation> {
		let rotation = self.info()?.display_rotation;
		Orientation::from_rotation(rotation)
			.ok_or_else(|| Error::Unsupported(format!("unknown display rotation {rotation}")))
	}

	/// Sets the orientation from a name, alias or degree value (`"left"`,
	/// `"l"`, `"90"`).
	pub fn set_orientation(&self, value: &str) -> Result<()> {
		let orientation = value
			.parse::<Orientation>()
			.map_err(|e| Error::InvalidArgument(e.to_string()))?;
		self.rotate(orientation)
	}

	pub fn rotate(&self, orientation: Orientation) -> Result<()> {
		self.call("setOrientation", vec![json!(orientation.name())]).map(drop)
	}

	// Text traversal and system panels

	pub fn last_traversed_text(&self) -> Result<Option<String>> {
		self.call_as("getLastTraversedText", vec![])
	}

	pub fn clear_traversed_text(&self) -> Result<()> {
		self.call("clearLastTraversedText", vec![]).map(drop)
	}

	pub fn open_notification(&self) -> Result<bool> {
		self.call_as("openNotification", vec![])
	}

	pub fn open_quick_settings(&self) -> Result<bool> {
		self.call_as("openQuickSettings", vec![])
	}

	// Keys and screen

	/// Presses a named key or a raw key code.
	pub fn press(&self, key: impl Into<KeyPress>) -> Result<bool> {
		match key.into() {
			KeyPress::Named(key) => self.call_as("pressKey", vec![json!(key.as_str())]),
			KeyPress::Code { code, meta: None } => self.call_as("pressKeyCode", vec![json!(code)]),
			KeyPress::Code { code, meta: Some(meta) } => self.call_as("pressKeyCode", vec![json!(code), json!(meta)]),
		}
	}

	pub fn wakeup(&self) -> Result<()> {
		self.call("wakeUp", vec![]).map(drop)
	}

	pub fn sleep(&self) -> Result<()> {
		self.call("sleep", vec![]).map(drop)
	}

	pub fn screen(&self) -> Screen<'_> {
		Screen { device: self }
	}

	// Waits

	/// Waits for the foreground app to go idle. `false` if it did not in time.
	pub fn wait_idle(&self, timeout: Duration) -> Result<bool> {
		let value = self.call_with_timeout("waitForIdle", vec![json!(timeout.as_millis() as u64)], timeout)?;
		Ok(serde_json::from_value(value)?)
	}

	/// Waits for a window content update, optionally of one package.
	pub fn wait_update(&self, timeout: Duration, package: Option<&str>) -> Result<bool> {
		let value = self.call_with_timeout(
			"waitForWindowUpdate",
			vec![json!(package), json!(timeout.as_millis() as u64)],
			timeout,
		)?;
		Ok(serde_json::from_value(value)?)
	}

	// Watchers and handlers

	/// Builder for an agent-side watcher called `name`.
	pub fn watcher(&self, name: impl Into<String>) -> Watcher<'_> {
		Watcher::new(self, name.into())
	}

	pub fn watchers(&self) -> Watchers<'_> {
		Watchers { device: self }
	}

	pub fn handlers(&self) -> Handlers<'_> {
		Handlers { device: self }
	}

	// Elements

	/// Element query. Nothing is sent until a method is called on the result.
	pub fn find(&self, selector: Selector) -> UiObject<'_> {
		UiObject::new(self, selector)
	}

	pub fn exists(&self, selector: &Selector) -> Result<bool> {
		self.call_as("exist", vec![selector.to_value()])
	}
}
