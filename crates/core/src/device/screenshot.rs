//! Screen capture.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};
use uia_runtime::Result;

use super::Device;

/// Platform level where the agent serves captures over plain HTTP.
const FAST_CAPTURE_MIN_SDK: u32 = 18;
const FAST_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

impl Device {
	/// Captures the screen into `path`.
	///
	/// Tries the agent's HTTP capture first, then falls back to capturing on
	/// the device and pulling the file. Returns `None` when neither produced
	/// a file.
	pub fn screenshot(&self, path: impl AsRef<Path>, scale: f32, quality: u8) -> Result<Option<PathBuf>> {
		let path = path.as_ref();

		if self.info()?.sdk_int >= FAST_CAPTURE_MIN_SDK {
			let route = format!("/screenshot/0?scale={scale}&quality={quality}");
			match self.channel()?.fetch(&route, FAST_CAPTURE_TIMEOUT) {
				Ok(bytes) if !bytes.is_empty() => {
					fs::write(path, &bytes)?;
					return Ok(Some(path.to_path_buf()));
				}
				Ok(_) => debug!(target = "uia", serial = self.serial(), "empty capture, falling back"),
				Err(e) => debug!(target = "uia", serial = self.serial(), error = %e, "HTTP capture failed, falling back"),
			}
		}

		let remote: Option<String> =
			self.call_as("takeScreenshot", vec![json!("screenshot.png"), json!(scale), json!(quality)])?;
		let Some(remote) = remote.filter(|r| !r.is_empty()) else {
			return Ok(None);
		};

		let bridge = self.manager().bridge();
		let pulled = bridge.pull(self.serial(), &remote, path);
		if let Err(e) = bridge.shell(self.serial(), &["rm", &remote]) {
			warn!(target = "uia", serial = self.serial(), remote = %remote, error = %e, "failed to remove device capture");
		}

		match pulled {
			Ok(()) => Ok(Some(path.to_path_buf())),
			Err(e) => {
				warn!(target = "uia", serial = self.serial(), remote = %remote, error = %e, "failed to pull capture");
				Ok(None)
			}
		}
	}
}
