//! Remote UI objects.
//!
//! A [`UiObject`] is a selector bound to a device. It caches nothing: every
//! method replays the selector on the agent, so the same object can be reused
//! across screen changes. [`UiElement`] holds the operations shared with
//! [`NamedUiObject`](crate::NamedUiObject).

use std::time::Duration;

use serde_json::{Value, json};
use uia_protocol::{Bounds, Corner, Direction, ObjectInfo, Point, Selector};
use uia_runtime::{Error, Result};

use crate::device::{DEFAULT_STEPS, Device};
use crate::named::NamedUiObject;

/// Default swipe limit for scroll/fling to beginning or end.
pub const DEFAULT_MAX_SWIPES: u32 = 1000;

fn millis(timeout: Duration) -> Value {
	json!(timeout.as_millis() as u64)
}

fn point(p: Point) -> Value {
	json!({"x": p.x, "y": p.y})
}

/// Operations on one element, however it is addressed.
///
/// Implementors provide the device and the value that addresses the element
/// in RPC parameters; everything else is shared.
pub trait UiElement {
	fn device(&self) -> &Device;

	/// First RPC parameter identifying this element.
	fn target(&self) -> Value;

	/// True if the element is currently on screen. Never fails for "not found",
	/// including a named element the agent has forgotten.
	fn exists(&self) -> Result<bool> {
		match self.device().call_as("exist", vec![self.target()]) {
			Err(err) if err.is_not_found() => Ok(false),
			other => other,
		}
	}

	fn info(&self) -> Result<ObjectInfo> {
		self.device().call_as("objInfo", vec![self.target()])
	}

	/// One `objInfo` field by wire name or alias (`description`).
	fn info_value(&self, name: &str) -> Result<Value> {
		self.info()?
			.lookup(name)
			.ok_or_else(|| Error::InvalidArgument(format!("unknown element info field '{name}'")))
	}

	/// Replaces the text of an editable element. An empty string clears it.
	fn set_text(&self, text: &str) -> Result<bool> {
		if text.is_empty() {
			self.clear_text()?;
			return Ok(true);
		}
		self.device().call_as("setText", vec![self.target(), json!(text)])
	}

	fn clear_text(&self) -> Result<()> {
		self.device().call("clearTextField", vec![self.target()]).map(drop)
	}

	/// Clicks the center of the element.
	fn click(&self) -> Result<bool> {
		self.device().call_as("click", vec![self.target()])
	}

	fn click_corner(&self, corner: Corner) -> Result<bool> {
		self.device().call_as("click", vec![self.target(), json!(corner.as_str())])
	}

	/// Clicks and waits up to `timeout` for a new window.
	fn click_and_wait(&self, timeout: Duration) -> Result<bool> {
		let value = self
			.device()
			.call_with_timeout("clickAndWaitForNewWindow", vec![self.target(), millis(timeout)], timeout)?;
		Ok(serde_json::from_value(value)?)
	}

	/// Long-clicks the element, or presses at the matching point of its bounds
	/// when the element is not long-clickable.
	fn long_click(&self, corner: Option<Corner>) -> Result<bool> {
		let info = self.info()?;
		if info.long_clickable {
			let mut params = vec![self.target()];
			params.extend(corner.map(|c| json!(c.as_str())));
			return self.device().call_as("longClick", params);
		}

		let bounds = info.effective_bounds();
		let at = match corner {
			Some(corner) => bounds.near(corner),
			None => bounds.center(),
		};
		self.device().long_click(at.x, at.y)
	}

	fn drag_to_point(&self, x: i32, y: i32, steps: u32) -> Result<bool> {
		self.device().call_as("dragTo", vec![self.target(), json!(x), json!(y), json!(steps)])
	}

	/// Drags onto the element matched by `selector`.
	fn drag_to(&self, selector: &Selector, steps: u32) -> Result<bool> {
		self.device().call_as("dragTo", vec![self.target(), selector.to_value(), json!(steps)])
	}

	/// Two-finger gesture from the `start` points to the `end` points.
	fn gesture(&self, start: (Point, Point), end: (Point, Point), steps: u32) -> Result<bool> {
		self.device().call_as(
			"gesture",
			vec![self.target(), point(start.0), point(start.1), point(end.0), point(end.1), json!(steps)],
		)
	}

	/// Three-finger gesture.
	fn gesture3(&self, start: [Point; 3], end: [Point; 3], steps: u32) -> Result<bool> {
		let mut params = vec![self.target()];
		params.extend(start.into_iter().chain(end).map(point));
		params.push(json!(steps));
		self.device().call_as("gesture", params)
	}

	/// Pinch from the edges toward the center; `percent` of the element size.
	fn pinch_in(&self, percent: u32, steps: u32) -> Result<bool> {
		self.device().call_as("pinchIn", vec![self.target(), json!(percent), json!(steps)])
	}

	fn pinch_out(&self, percent: u32, steps: u32) -> Result<bool> {
		self.device().call_as("pinchOut", vec![self.target(), json!(percent), json!(steps)])
	}

	/// Swipes across the element. `percent` (0..1, API 18+) limits the
	/// distance; `None` swipes the full size.
	fn swipe(&self, direction: Direction, steps: u32, percent: Option<f32>) -> Result<bool> {
		let params = match percent.filter(|p| *p != 1.0) {
			Some(p) => vec![self.target(), json!(direction.as_str()), json!(p), json!(steps)],
			None => vec![self.target(), json!(direction.as_str()), json!(steps)],
		};
		self.device().call_as("swipe", params)
	}

	/// Waits up to `timeout` for the element to appear; `false` if it did not.
	fn wait_exists(&self, timeout: Duration) -> Result<bool> {
		let value = self
			.device()
			.call_with_timeout("waitForExists", vec![self.target(), millis(timeout)], timeout)?;
		Ok(serde_json::from_value(value)?)
	}

	/// Waits up to `timeout` for the element to disappear; `false` if it did not.
	/// An element the agent no longer knows counts as gone.
	fn wait_gone(&self, timeout: Duration) -> Result<bool> {
		match self
			.device()
			.call_with_timeout("waitUntilGone", vec![self.target(), millis(timeout)], timeout)
		{
			Ok(value) => Ok(serde_json::from_value(value)?),
			Err(err) if err.is_not_found() => Ok(true),
			Err(err) => Err(err),
		}
	}
}

/// Scroll or fling orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
	#[default]
	Vertical,
	Horizontal,
}

impl Axis {
	fn is_vertical(self) -> bool {
		self == Axis::Vertical
	}
}

/// Scroll action for [`UiObject::scroll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scroll {
	Forward { steps: u32 },
	Backward { steps: u32 },
	ToBeginning { steps: u32, max_swipes: u32 },
	ToEnd { steps: u32, max_swipes: u32 },
	/// Scrolls until an element matching the selector is visible.
	To(Selector),
}

impl Scroll {
	pub fn forward() -> Self {
		Self::Forward { steps: DEFAULT_STEPS }
	}

	pub fn backward() -> Self {
		Self::Backward { steps: DEFAULT_STEPS }
	}

	pub fn to_beginning() -> Self {
		Self::ToBeginning {
			steps: DEFAULT_STEPS,
			max_swipes: DEFAULT_MAX_SWIPES,
		}
	}

	pub fn to_end() -> Self {
		Self::ToEnd {
			steps: DEFAULT_STEPS,
			max_swipes: DEFAULT_MAX_SWIPES,
		}
	}
}

/// Fling action for [`UiObject::fling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fling {
	Forward,
	Backward,
	ToBeginning { max_swipes: u32 },
	ToEnd { max_swipes: u32 },
}

/// Side used by the relative-position lookups.
#[derive(Clone, Copy)]
enum Side {
	Right,
	Left,
	Up,
	Down,
}

impl Side {
	/// Gap between `from` and `other` on this side, `None` when `other` is not
	/// beside `from` (no overlap on the perpendicular axis).
	fn distance(self, from: &Bounds, other: &Bounds) -> Option<i32> {
		let overlap = from.intersect(other);
		let dist = match self {
			Side::Right if overlap.top < overlap.bottom => other.left - from.right,
			Side::Left if overlap.top < overlap.bottom => from.left - other.right,
			Side::Up if overlap.left < overlap.right => from.top - other.bottom,
			Side::Down if overlap.left < overlap.right => other.top - from.bottom,
			_ => return None,
		};
		(dist >= 0).then_some(dist)
	}
}

/// A selector bound to a device.
#[derive(Debug, Clone)]
pub struct UiObject<'d> {
	device: &'d Device,
	selector: Selector,
}

impl<'d> UiElement for UiObject<'d> {
	fn device(&self) -> &Device {
		self.device
	}

	fn target(&self) -> Value {
		self.selector.to_value()
	}
}

impl<'d> UiObject<'d> {
	pub fn new(device: &'d Device, selector: Selector) -> Self {
		Self { device, selector }
	}

	pub fn selector(&self) -> &Selector {
		&self.selector
	}

	fn with_selector(&self, selector: Selector) -> Self {
		Self::new(self.device, selector)
	}

	/// Narrows to a descendant matching `selector`.
	pub fn child(&self, selector: Selector) -> Self {
		self.with_selector(self.selector.child(selector))
	}

	/// Narrows to a sibling matching `selector`.
	pub fn sibling(&self, selector: Selector) -> Self {
		self.with_selector(self.selector.sibling(selector))
	}

	pub fn child_selector(&self, selector: Selector) -> Self {
		self.child(selector)
	}

	pub fn from_parent(&self, selector: Selector) -> Self {
		self.sibling(selector)
	}

	/// Number of elements currently matching.
	pub fn count(&self) -> Result<u32> {
		self.device.call_as("count", vec![self.target()])
	}

	/// The `index`-th match.
	///
	/// A single match returns the receiver unchanged; otherwise the selector
	/// gains `instance = index`.
	pub fn nth(&self, index: u32) -> Result<Self> {
		let count = self.count()?;
		self.nth_of(index, count)
	}

	fn nth_of(&self, index: u32, count: u32) -> Result<Self> {
		if index >= count {
			return Err(Error::ElementNotFound(format!(
				"index {index} out of range ({count} matches) for {}",
				self.selector
			)));
		}
		if count == 1 {
			return Ok(self.clone());
		}
		Ok(self.with_selector(self.selector.instance(index)))
	}

	/// Every current match, in instance order.
	pub fn all(&self) -> Result<Vec<Self>> {
		let count = self.count()?;
		(0..count).map(|i| self.nth_of(i, count)).collect()
	}

	/// Closest element matching `selector` to the right of this one.
	pub fn right(&self, selector: &Selector) -> Result<Option<Self>> {
		self.beside(Side::Right, selector)
	}

	pub fn left(&self, selector: &Selector) -> Result<Option<Self>> {
		self.beside(Side::Left, selector)
	}

	pub fn up(&self, selector: &Selector) -> Result<Option<Self>> {
		self.beside(Side::Up, selector)
	}

	pub fn down(&self, selector: &Selector) -> Result<Option<Self>> {
		self.beside(Side::Down, selector)
	}

	fn beside(&self, side: Side, selector: &Selector) -> Result<Option<Self>> {
		let origin = self.info()?.bounds;
		let mut best: Option<(i32, Self)> = None;
		for candidate in self.with_selector(selector.clone()).all()? {
			let bounds = candidate.info()?.bounds;
			if let Some(dist) = side.distance(&origin, &bounds) {
				if best.as_ref().is_none_or(|(min, _)| dist < *min) {
					best = Some((dist, candidate));
				}
			}
		}
		Ok(best.map(|(_, found)| found))
	}

	fn named(&self, method: &str, params: Vec<Value>) -> Result<NamedUiObject<'d>> {
		let name: String = self.device.call_as(method, params)?;
		Ok(NamedUiObject::new(self.device, name))
	}

	/// Child under this (scrollable) container whose subtree has `text`.
	///
	/// With `allow_scroll` unset the agent decides whether to scroll.
	pub fn child_by_text(&self, child: &Selector, text: &str, allow_scroll: Option<bool>) -> Result<NamedUiObject<'d>> {
		let mut params = vec![self.target(), child.to_value(), json!(text)];
		params.extend(allow_scroll.map(|a| json!(a)));
		self.named("childByText", params)
	}

	pub fn child_by_description(
		&self,
		child: &Selector,
		description: &str,
		allow_scroll: Option<bool>,
	) -> Result<NamedUiObject<'d>> {
		let mut params = vec![self.target(), child.to_value(), json!(description)];
		params.extend(allow_scroll.map(|a| json!(a)));
		self.named("childByDescription", params)
	}

	pub fn child_by_instance(&self, child: &Selector, instance: u32) -> Result<NamedUiObject<'d>> {
		self.named("childByInstance", vec![self.target(), child.to_value(), json!(instance)])
	}

	pub fn scroll(&self, axis: Axis, action: Scroll) -> Result<bool> {
		let vertical = json!(axis.is_vertical());
		let (method, params) = match action {
			Scroll::Forward { steps } => ("scrollForward", vec![self.target(), vertical, json!(steps)]),
			Scroll::Backward { steps } => ("scrollBackward", vec![self.target(), vertical, json!(steps)]),
			Scroll::ToBeginning { steps, max_swipes } => (
				"scrollToBeginning",
				vec![self.target(), vertical, json!(max_swipes), json!(steps)],
			),
			Scroll::ToEnd { steps, max_swipes } => {
				("scrollToEnd", vec![self.target(), vertical, json!(max_swipes), json!(steps)])
			}
			Scroll::To(target) => ("scrollTo", vec![self.target(), target.to_value(), vertical]),
		};
		self.device.call_as(method, params)
	}

	pub fn fling(&self, axis: Axis, action: Fling) -> Result<bool> {
		let vertical = json!(axis.is_vertical());
		let (method, params) = match action {
			Fling::Forward => ("flingForward", vec![self.target(), vertical]),
			Fling::Backward => ("flingBackward", vec![self.target(), vertical]),
			Fling::ToBeginning { max_swipes } => ("flingToBeginning", vec![self.target(), vertical, json!(max_swipes)]),
			Fling::ToEnd { max_swipes } => ("flingToEnd", vec![self.target(), vertical, json!(max_swipes)]),
		};
		self.device.call_as(method, params)
	}
}
