//! uia: Rust client for the Android uiautomator JSON-RPC agent.
//!
//! A [`Device`] drives one Android device through the agent running on it.
//! The agent is installed, started and forwarded on first use, and restarted
//! transparently when it stops answering.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use uia::prelude::*;
//!
//! fn main() -> uia::Result<()> {
//!     let device = Device::connect(Config::from_env()?)?;
//!     device.screen().on()?;
//!     device.press(Key::Home)?;
//!
//!     let clock = device.find(Selector::new().text("Clock").class_name("android.widget.TextView"));
//!     if clock.wait_exists(Duration::from_secs(5))? {
//!         clock.click()?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - `uia-protocol`: wire types ([`Selector`], [`DeviceInfo`], key names)
//! - `uia-runtime`: adb bridge, session manager, JSON-RPC channel
//! - this crate: [`Device`], [`UiObject`], watchers and handlers

pub mod device;
pub mod handlers;
pub mod named;
pub mod object;

pub use device::{DEFAULT_STEPS, Device, DumpOptions, Screen, ScreenState, Watcher, Watchers, pretty_xml};
pub use handlers::{HandlerFn, HandlerId, Handlers};
pub use named::NamedUiObject;
pub use object::{Axis, DEFAULT_MAX_SWIPES, Fling, Scroll, UiElement, UiObject};
pub use uia_protocol::{
	Bounds, Corner, DeviceInfo, Direction, Field, Key, KeyPress, ObjectInfo, Orientation, Point, Selector, SelectorError,
};
pub use uia_runtime::{Config, Error, Result, SessionManager};

/// Everything needed for typical scripts.
pub mod prelude {
	pub use crate::{
		Axis, Config, Corner, Device, Direction, Fling, Key, KeyPress, Orientation, Point, Result, Scroll, Selector,
		UiElement, UiObject,
	};
}
