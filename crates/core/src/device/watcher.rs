//! Agent-side watchers.
//!
//! A watcher is a named rule held by the agent: when every condition selector
//! matches, it clicks an element or presses keys. The client keeps only the
//! name and the conditions gathered before registration.

use serde_json::{Value, json};
use uia_protocol::{Key, Selector};
use uia_runtime::Result;

use super::Device;

/// Builder and handle for one named watcher.
#[must_use = "a watcher is only registered by click() or press()"]
pub struct Watcher<'d> {
	device: &'d Device,
	name: String,
	conditions: Vec<Selector>,
}

impl<'d> Watcher<'d> {
	pub(crate) fn new(device: &'d Device, name: String) -> Self {
		Self {
			device,
			name,
			conditions: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Adds a condition; all conditions must match for the watcher to fire.
	pub fn when(mut self, selector: Selector) -> Self {
		self.conditions.push(selector);
		self
	}

	fn conditions(&self) -> Value {
		Value::Array(self.conditions.iter().map(Selector::to_value).collect())
	}

	/// Registers the watcher to click `target` when triggered.
	pub fn click(self, target: &Selector) -> Result<()> {
		self.device
			.call(
				"registerClickUiObjectWatcher",
				vec![json!(self.name), self.conditions(), target.to_value()],
			)
			.map(drop)
	}

	/// Registers the watcher to press `keys` in order when triggered.
	pub fn press(self, keys: &[Key]) -> Result<()> {
		let keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
		self.device
			.call("registerPressKeyskWatcher", vec![json!(self.name), self.conditions(), json!(keys)])
			.map(drop)
	}

	pub fn triggered(&self) -> Result<bool> {
		self.device.call_as("hasWatcherTriggered", vec![json!(self.name)])
	}

	pub fn remove(&self) -> Result<()> {
		self.device.call("removeWatcher", vec![json!(self.name)]).map(drop)
	}
}

/// All registered watchers, returned by [`Device::watchers`].
pub struct Watchers<'d> {
	pub(crate) device: &'d Device,
}

impl Watchers<'_> {
	/// Names of the registered watchers.
	pub fn list(&self) -> Result<Vec<String>> {
		self.device.call_as("getWatchers", vec![])
	}

	/// True if any watcher has fired since the last reset.
	pub fn triggered(&self) -> Result<bool> {
		self.device.call_as("hasAnyWatcherTriggered", vec![])
	}

	pub fn remove(&self, name: &str) -> Result<()> {
		self.device.call("removeWatcher", vec![json!(name)]).map(drop)
	}

	pub fn remove_all(&self) -> Result<()> {
		for name in self.list()? {
			self.remove(&name)?;
		}
		Ok(())
	}

	pub fn reset(&self) -> Result<()> {
		self.device.call("resetWatcherTriggers", vec![]).map(drop)
	}

	/// Forces the agent to evaluate every watcher now.
	pub fn run(&self) -> Result<()> {
		self.device.call("runWatchers", vec![]).map(drop)
	}
}
