//! Display orientation states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised for tokens that name no orientation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid orientation '{0}' (expected natural/n, left/l, upsidedown/u, right/r or 0/90/180/270)")]
pub struct ParseOrientationError(pub String);

/// One of the four display rotations.
///
/// | State        | Alias | Rotation | `displayRotation` |
/// |--------------|-------|----------|-------------------|
/// | `natural`    | `n`   | 0°       | 0                 |
/// | `left`       | `l`   | 90°      | 1                 |
/// | `upsidedown` | `u`   | 180°     | 2                 |
/// | `right`      | `r`   | 270°     | 3                 |
///
/// Setting `upsidedown` is rejected by platforms below API 18; the agent
/// reports that as an RPC error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
	Natural,
	Left,
	#[serde(rename = "upsidedown")]
	UpsideDown,
	Right,
}

impl Orientation {
	pub const ALL: [Orientation; 4] = [Self::Natural, Self::Left, Self::UpsideDown, Self::Right];

	/// Maps the agent's `displayRotation` (0..=3).
	pub fn from_rotation(rotation: u8) -> Option<Self> {
		Self::ALL.get(rotation as usize).copied()
	}

	/// Canonical name, also the value sent to `setOrientation`.
	pub fn name(self) -> &'static str {
		match self {
			Self::Natural => "natural",
			Self::Left => "left",
			Self::UpsideDown => "upsidedown",
			Self::Right => "right",
		}
	}

	pub fn alias(self) -> &'static str {
		match self {
			Self::Natural => "n",
			Self::Left => "l",
			Self::UpsideDown => "u",
			Self::Right => "r",
		}
	}

	pub fn degrees(self) -> u16 {
		match self {
			Self::Natural => 0,
			Self::Left => 90,
			Self::UpsideDown => 180,
			Self::Right => 270,
		}
	}

	pub fn rotation(self) -> u8 {
		match self {
			Self::Natural => 0,
			Self::Left => 1,
			Self::UpsideDown => 2,
			Self::Right => 3,
		}
	}
}

impl FromStr for Orientation {
	type Err = ParseOrientationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let token = s.trim();
		Self::ALL
			.iter()
			.copied()
			.find(|o| o.name() == token || o.alias() == token || o.degrees().to_string() == token)
			.ok_or_else(|| ParseOrientationError(s.to_string()))
	}
}

impl fmt::Display for Orientation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}
