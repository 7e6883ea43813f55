//! Screen power state.

use std::fmt;

use uia_runtime::{Error, Result};

use super::Device;

/// Power state of the display.
///
/// Compares equal to `"on"` / `"off"` in any letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
	On,
	Off,
}

impl ScreenState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::On => "on",
			Self::Off => "off",
		}
	}

	/// Parses `on` / `off`, ignoring case.
	pub fn parse(token: &str) -> Option<Self> {
		if token.eq_ignore_ascii_case("on") {
			Some(Self::On)
		} else if token.eq_ignore_ascii_case("off") {
			Some(Self::Off)
		} else {
			None
		}
	}
}

impl PartialEq<str> for ScreenState {
	fn eq(&self, other: &str) -> bool {
		Self::parse(other) == Some(*self)
	}
}

impl PartialEq<&str> for ScreenState {
	fn eq(&self, other: &&str) -> bool {
		self == *other
	}
}

impl fmt::Display for ScreenState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn invalid_token(token: &str) -> Error {
	Error::InvalidArgument(format!("invalid screen state '{token}' (expected on or off)"))
}

/// Screen controls returned by [`Device::screen`].
pub struct Screen<'d> {
	pub(crate) device: &'d Device,
}

impl Screen<'_> {
	pub fn on(&self) -> Result<()> {
		self.device.wakeup()
	}

	pub fn off(&self) -> Result<()> {
		self.device.sleep()
	}

	/// Turns the screen `on` or `off` by name.
	pub fn set(&self, token: &str) -> Result<()> {
		match ScreenState::parse(token).ok_or_else(|| invalid_token(token))? {
			ScreenState::On => self.on(),
			ScreenState::Off => self.off(),
		}
	}

	/// Current state.
	///
	/// # Errors
	///
	/// [`Error::Unsupported`] on platforms that do not report it (Android 4.3
	/// and older).
	pub fn state(&self) -> Result<ScreenState> {
		match self.device.info()?.screen_on {
			Some(true) => Ok(ScreenState::On),
			Some(false) => Ok(ScreenState::Off),
			None => Err(Error::Unsupported("screen state is not reported on Android 4.3 and older".into())),
		}
	}

	/// True if the screen is in the state named by `token`.
	pub fn is(&self, token: &str) -> Result<bool> {
		let wanted = ScreenState::parse(token).ok_or_else(|| invalid_token(token))?;
		Ok(self.state()? == wanted)
	}
}
