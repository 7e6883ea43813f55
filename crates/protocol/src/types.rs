//! Core protocol types used across the wire.
//!
//! Device and element snapshots returned by the agent, plus the small value
//! types (points, bounds, corners, directions) passed as RPC parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A point in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
	pub x: i32,
	pub y: i32,
}

impl Point {
	pub const fn new(x: i32, y: i32) -> Self {
		Self { x, y }
	}
}

impl From<(i32, i32)> for Point {
	fn from((x, y): (i32, i32)) -> Self {
		Self { x, y }
	}
}

/// Element rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
	pub top: i32,
	pub left: i32,
	pub bottom: i32,
	pub right: i32,
}

impl Bounds {
	pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
		Self { top, left, bottom, right }
	}

	/// Center point.
	pub fn center(&self) -> Point {
		Point::new((self.left + self.right) / 2, (self.top + self.bottom) / 2)
	}

	/// Point one sixth of the way in from the given corner.
	pub fn near(&self, corner: Corner) -> Point {
		match corner {
			Corner::TopLeft => Point::new((5 * self.left + self.right) / 6, (5 * self.top + self.bottom) / 6),
			Corner::BottomRight => Point::new((self.left + 5 * self.right) / 6, (self.top + 5 * self.bottom) / 6),
		}
	}

	/// Overlap of two rectangles. The result may be empty (`left >= right` or
	/// `top >= bottom`).
	pub fn intersect(&self, other: &Bounds) -> Bounds {
		Bounds {
			top: self.top.max(other.top),
			left: self.left.max(other.left),
			bottom: self.bottom.min(other.bottom),
			right: self.right.min(other.right),
		}
	}
}

/// Corner used for corner clicks and long clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
	#[serde(rename = "tl")]
	TopLeft,
	#[serde(rename = "br")]
	BottomRight,
}

impl Corner {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::TopLeft => "tl",
			Self::BottomRight => "br",
		}
	}
}

impl std::str::FromStr for Corner {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"tl" | "topleft" => Ok(Self::TopLeft),
			"br" | "bottomright" => Ok(Self::BottomRight),
			other => Err(format!("invalid corner '{other}' (expected tl/topleft or br/bottomright)")),
		}
	}
}

/// Swipe direction on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	Up,
	Down,
	Left,
	Right,
}

impl Direction {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Up => "up",
			Self::Down => "down",
			Self::Left => "left",
			Self::Right => "right",
		}
	}
}

/// Device snapshot returned by `deviceInfo`.
///
/// Fields the agent adds in newer versions are kept in `extra`, so
/// [`DeviceInfo::lookup`] can still reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
	#[serde(default)]
	pub current_package_name: Option<String>,
	pub display_width: u32,
	pub display_height: u32,
	/// 0..=3, see [`Orientation::from_rotation`](crate::Orientation::from_rotation).
	pub display_rotation: u8,
	#[serde(default)]
	pub display_size_dp_x: u32,
	#[serde(default)]
	pub display_size_dp_y: u32,
	#[serde(default)]
	pub natural_orientation: bool,
	#[serde(default)]
	pub product_name: Option<String>,
	/// Absent on platforms older than API 18.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screen_on: Option<bool>,
	#[serde(default)]
	pub sdk_int: u32,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Short names accepted by [`DeviceInfo::lookup`].
pub const DEVICE_INFO_ALIASES: &[(&str, &str)] = &[("width", "displayWidth"), ("height", "displayHeight")];

/// Short names accepted by [`ObjectInfo::lookup`].
pub const OBJECT_INFO_ALIASES: &[(&str, &str)] = &[("description", "contentDescription")];

/// Resolves `name` through an alias table, returning it unchanged when no
/// alias applies.
pub fn resolve_alias<'a>(aliases: &[(&'static str, &'static str)], name: &'a str) -> &'a str {
	aliases
		.iter()
		.find(|(alias, _)| *alias == name)
		.map(|(_, target)| *target)
		.unwrap_or(name)
}

fn lookup_field<T: Serialize>(value: &T, aliases: &[(&'static str, &'static str)], name: &str) -> Option<Value> {
	let Ok(Value::Object(map)) = serde_json::to_value(value) else {
		return None;
	};
	map.get(name).or_else(|| map.get(resolve_alias(aliases, name))).cloned()
}

impl DeviceInfo {
	/// Returns a field by wire name or alias (`width`, `height`).
	pub fn lookup(&self, name: &str) -> Option<Value> {
		lookup_field(self, DEVICE_INFO_ALIASES, name)
	}
}

/// Element snapshot returned by `objInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
	pub bounds: Bounds,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub visible_bounds: Option<Bounds>,
	#[serde(default)]
	pub checkable: bool,
	#[serde(default)]
	pub checked: bool,
	#[serde(default)]
	pub child_count: u32,
	#[serde(default)]
	pub class_name: Option<String>,
	#[serde(default)]
	pub content_description: Option<String>,
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub focusable: bool,
	#[serde(default)]
	pub focused: bool,
	#[serde(default)]
	pub clickable: bool,
	#[serde(default)]
	pub long_clickable: bool,
	#[serde(default)]
	pub package_name: Option<String>,
	#[serde(default)]
	pub resource_name: Option<String>,
	#[serde(default)]
	pub scrollable: bool,
	#[serde(default)]
	pub selected: bool,
	#[serde(default)]
	pub text: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl ObjectInfo {
	/// Returns a field by wire name or alias (`description`).
	pub fn lookup(&self, name: &str) -> Option<Value> {
		lookup_field(self, OBJECT_INFO_ALIASES, name)
	}

	/// Visible bounds when reported, full bounds otherwise.
	pub fn effective_bounds(&self) -> Bounds {
		self.visible_bounds.unwrap_or(self.bounds)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn device_info() -> DeviceInfo {
		serde_json::from_value(json!({
			"currentPackageName": "com.android.launcher",
			"displayWidth": 1080,
			"displayHeight": 1920,
			"displayRotation": 1,
			"displaySizeDpX": 360,
			"displaySizeDpY": 640,
			"naturalOrientation": true,
			"productName": "sdk_phone",
			"screenOn": true,
			"sdkInt": 29,
			"brandNew": "kept"
		}))
		.unwrap()
	}

	#[test]
	fn device_info_aliases_resolve() {
		let info = device_info();
		assert_eq!(info.lookup("width"), Some(json!(1080)));
		assert_eq!(info.lookup("height"), Some(json!(1920)));
		assert_eq!(info.lookup("displayRotation"), Some(json!(1)));
		assert_eq!(info.lookup("brandNew"), Some(json!("kept")));
		assert_eq!(info.lookup("nope"), None);
	}

	#[test]
	fn screen_on_is_optional() {
		let info: DeviceInfo = serde_json::from_value(json!({
			"displayWidth": 480, "displayHeight": 800, "displayRotation": 0
		}))
		.unwrap();
		assert_eq!(info.screen_on, None);
		assert_eq!(info.sdk_int, 0);
	}

	#[test]
	fn object_info_description_alias() {
		let info: ObjectInfo = serde_json::from_value(json!({
			"bounds": {"top": 0, "left": 0, "bottom": 100, "right": 200},
			"contentDescription": "Play",
			"longClickable": true
		}))
		.unwrap();
		assert_eq!(info.lookup("description"), Some(json!("Play")));
		assert!(info.long_clickable);
		assert_eq!(info.effective_bounds(), info.bounds);
	}

	#[test]
	fn bounds_geometry() {
		let b = Bounds::new(0, 0, 60, 120);
		assert_eq!(b.center(), Point::new(60, 30));
		assert_eq!(b.near(Corner::TopLeft), Point::new(20, 10));
		assert_eq!(b.near(Corner::BottomRight), Point::new(100, 50));

		let overlap = b.intersect(&Bounds::new(30, 100, 90, 200));
		assert_eq!(overlap, Bounds::new(30, 100, 60, 120));
	}

	#[test]
	fn resolve_alias_passthrough() {
		assert_eq!(resolve_alias(DEVICE_INFO_ALIASES, "width"), "displayWidth");
		assert_eq!(resolve_alias(DEVICE_INFO_ALIASES, "sdkInt"), "sdkInt");
	}
}
