//! Agent-side named element handles.

use serde_json::{Value, json};
use uia_protocol::Selector;
use uia_runtime::Result;

use crate::device::Device;
use crate::object::UiElement;

/// An element the agent resolved and stored under a generated name.
///
/// Returned by the `child_by_*` lookups. The name is passed in place of a
/// selector, so the handle keeps pointing at the same element until the agent
/// forgets it; calls on a forgotten name fail with
/// [`Error::ElementNotFound`](uia_runtime::Error::ElementNotFound).
#[derive(Debug, Clone)]
pub struct NamedUiObject<'d> {
	device: &'d Device,
	name: String,
}

impl UiElement for NamedUiObject<'_> {
	fn device(&self) -> &Device {
		self.device
	}

	fn target(&self) -> Value {
		json!(self.name)
	}
}

impl<'d> NamedUiObject<'d> {
	pub(crate) fn new(device: &'d Device, name: String) -> Self {
		Self { device, name }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn resolve(&self, method: &str, selector: &Selector) -> Result<Self> {
		let name: String = self.device.call_as(method, vec![self.target(), selector.to_value()])?;
		Ok(Self::new(self.device, name))
	}

	/// Descendant matching `selector`, as a new named handle.
	pub fn child(&self, selector: &Selector) -> Result<Self> {
		self.resolve("getChild", selector)
	}

	/// Sibling matching `selector`, as a new named handle.
	pub fn sibling(&self, selector: &Selector) -> Result<Self> {
		self.resolve("getFromParent", selector)
	}
}
