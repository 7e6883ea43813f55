//! Hardware and navigation keys understood by `pressKey`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key '{0}'")]
pub struct ParseKeyError(pub String);

/// Named key accepted by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
	Home,
	Back,
	Left,
	Right,
	Up,
	Down,
	Center,
	Menu,
	Search,
	Enter,
	Delete,
	Recent,
	VolumeUp,
	VolumeDown,
	VolumeMute,
	Camera,
	Power,
}

impl Key {
	pub const ALL: [Key; 17] = [
		Self::Home,
		Self::Back,
		Self::Left,
		Self::Right,
		Self::Up,
		Self::Down,
		Self::Center,
		Self::Menu,
		Self::Search,
		Self::Enter,
		Self::Delete,
		Self::Recent,
		Self::VolumeUp,
		Self::VolumeDown,
		Self::VolumeMute,
		Self::Camera,
		Self::Power,
	];

	/// Name sent to `pressKey`.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Home => "home",
			Self::Back => "back",
			Self::Left => "left",
			Self::Right => "right",
			Self::Up => "up",
			Self::Down => "down",
			Self::Center => "center",
			Self::Menu => "menu",
			Self::Search => "search",
			Self::Enter => "enter",
			Self::Delete => "delete",
			Self::Recent => "recent",
			Self::VolumeUp => "volume_up",
			Self::VolumeDown => "volume_down",
			Self::VolumeMute => "volume_mute",
			Self::Camera => "camera",
			Self::Power => "power",
		}
	}
}

impl FromStr for Key {
	type Err = ParseKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let token = s.trim().to_ascii_lowercase();
		if token == "del" {
			return Ok(Self::Delete);
		}
		Self::ALL
			.iter()
			.copied()
			.find(|k| k.as_str() == token)
			.ok_or_else(|| ParseKeyError(s.to_string()))
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A key press: either a named key or a raw Android key code with an
/// optional meta state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
	Named(Key),
	Code { code: i32, meta: Option<i32> },
}

impl KeyPress {
	pub fn code(code: i32) -> Self {
		Self::Code { code, meta: None }
	}

	pub fn code_with_meta(code: i32, meta: i32) -> Self {
		Self::Code { code, meta: Some(meta) }
	}
}

impl From<Key> for KeyPress {
	fn from(key: Key) -> Self {
		Self::Named(key)
	}
}

/// Accepts a key name or a decimal key code.
impl FromStr for KeyPress {
	type Err = ParseKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Ok(code) = s.trim().parse::<i32>() {
			return Ok(Self::code(code));
		}
		s.parse::<Key>().map(Self::Named)
	}
}
