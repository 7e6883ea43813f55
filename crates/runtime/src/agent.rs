//! On-device agent packages: lookup, version check, install, start.
//!
//! The agent ships as two APKs (app and instrumentation test). They are only
//! needed when the device lacks the expected agent build.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::bridge::{Bridge, ProcessHandle};
use crate::config::AgentConfig;
use crate::error::{Error, Result};

pub const AGENT_PACKAGE: &str = "com.github.uiautomator";
pub const AGENT_TEST_PACKAGE: &str = "com.github.uiautomator.test";
pub const AGENT_RUNNER: &str = "android.support.test.runner.AndroidJUnitRunner";
pub const APK_NAME: &str = "app-uiautomator.apk";
pub const TEST_APK_NAME: &str = "app-uiautomator-test.apk";
/// Staging directory on the device for pushed packages.
pub const REMOTE_TMP: &str = "/data/local/tmp";

static VERSION_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"versionName=(\S+)").unwrap());

/// Resolved locations of the two agent packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPackage {
	pub apk: PathBuf,
	pub test_apk: PathBuf,
}

impl AgentPackage {
	/// Locates the agent packages.
	///
	/// Search order:
	/// 1. `UIA_AGENT_APK` and `UIA_AGENT_TEST_APK`
	/// 2. `UIA_AGENT_DIR`
	/// 3. `<data dir>/uia/agent` (e.g. `~/.local/share/uia/agent`)
	///
	/// # Errors
	///
	/// Returns [`Error::AgentPackageNotFound`] listing every place searched.
	pub fn locate(config: &AgentConfig) -> Result<Self> {
		let mut searched = Vec::new();

		if let (Some(apk), Some(test_apk)) = (&config.apk, &config.test_apk) {
			if apk.is_file() && test_apk.is_file() {
				return Ok(Self {
					apk: apk.clone(),
					test_apk: test_apk.clone(),
				});
			}
			searched.push(apk.clone());
			searched.push(test_apk.clone());
		}

		let candidates = config
			.dir
			.clone()
			.into_iter()
			.chain(dirs::data_dir().map(|d| d.join("uia").join("agent")));
		for dir in candidates {
			if let Some(found) = Self::in_dir(&dir) {
				return Ok(found);
			}
			searched.push(dir);
		}

		Err(Error::AgentPackageNotFound(searched))
	}

	fn in_dir(dir: &Path) -> Option<Self> {
		let apk = dir.join(APK_NAME);
		let test_apk = dir.join(TEST_APK_NAME);
		(apk.is_file() && test_apk.is_file()).then_some(Self { apk, test_apk })
	}
}

/// Extracts the first `versionName=` from `dumpsys package` output.
pub fn parse_version_name(dumpsys: &str) -> Option<String> {
	VERSION_NAME.captures(dumpsys).map(|c| c[1].to_string())
}

/// Reads the installed agent version, `None` when the agent is absent.
pub fn installed_version(bridge: &dyn Bridge, serial: &str) -> Result<Option<String>> {
	let out = bridge.shell(serial, &["dumpsys", "package", AGENT_PACKAGE])?;
	Ok(parse_version_name(&out.stdout))
}

/// Pushes both packages to the device and installs them.
pub fn install(bridge: &dyn Bridge, serial: &str, package: &AgentPackage) -> Result<()> {
	for apk in [&package.apk, &package.test_apk] {
		let name = apk
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.ok_or_else(|| Error::InvalidArgument(format!("not a file: {}", apk.display())))?;
		let remote = format!("{REMOTE_TMP}/{name}");

		info!(target = "uia", serial, apk = %apk.display(), "installing agent package");
		bridge.push(serial, apk, &remote)?;
		let out = bridge.shell(serial, &["pm", "install", "-r", "-t", &remote])?;
		if !out.stdout.contains("Success") {
			return Err(Error::Bridge(format!(
				"pm install {remote} failed: {}",
				first_line(&out.stdout).or(first_line(&out.stderr)).unwrap_or("no output")
			)));
		}
		debug!(target = "uia", serial, remote, "installed");
	}
	Ok(())
}

/// Starts the agent as a headless instrumentation process.
pub fn start(bridge: &dyn Bridge, serial: &str) -> Result<Box<dyn ProcessHandle>> {
	let target = format!("{AGENT_TEST_PACKAGE}/{AGENT_RUNNER}");
	info!(target = "uia", serial, "starting agent instrumentation");
	bridge.spawn(serial, &["am", "instrument", "-w", &target])
}

fn first_line(s: &str) -> Option<&str> {
	s.lines().map(str::trim).find(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;
	use crate::testing::{BridgeCall, FakeBridge};

	const DUMPSYS: &str = "Packages:\n  Package [com.github.uiautomator] (4a3b):\n    versionCode=17 minSdk=18 targetSdk=25\n    versionName=1.1.7\n    splits=[base]\n";

	#[test]
	fn parses_version_name() {
		assert_eq!(parse_version_name(DUMPSYS).as_deref(), Some("1.1.7"));
		assert_eq!(parse_version_name("Unable to find package"), None);
	}

	#[test]
	fn locates_packages_in_dir() {
		let temp = TempDir::new().unwrap();
		fs::write(temp.path().join(APK_NAME), b"apk").unwrap();
		fs::write(temp.path().join(TEST_APK_NAME), b"apk").unwrap();

		let config = AgentConfig {
			dir: Some(temp.path().to_path_buf()),
			..AgentConfig::default()
		};
		let found = AgentPackage::locate(&config).unwrap();
		assert_eq!(found.apk, temp.path().join(APK_NAME));
		assert_eq!(found.test_apk, temp.path().join(TEST_APK_NAME));
	}

	#[test]
	fn explicit_paths_win() {
		let temp = TempDir::new().unwrap();
		let apk = temp.path().join("a.apk");
		let test_apk = temp.path().join("b.apk");
		fs::write(&apk, b"a").unwrap();
		fs::write(&test_apk, b"b").unwrap();

		let config = AgentConfig {
			apk: Some(apk.clone()),
			test_apk: Some(test_apk.clone()),
			..AgentConfig::default()
		};
		assert_eq!(AgentPackage::locate(&config).unwrap(), AgentPackage { apk, test_apk });
	}

	#[test]
	fn missing_dir_lists_search_path() {
		let temp = TempDir::new().unwrap();
		let config = AgentConfig {
			dir: Some(temp.path().join("nowhere")),
			..AgentConfig::default()
		};
		match AgentPackage::locate(&config) {
			Err(Error::AgentPackageNotFound(searched)) => assert_eq!(searched[0], temp.path().join("nowhere")),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn install_pushes_then_installs() {
		let bridge = FakeBridge::new(&["emu"]);
		let package = AgentPackage {
			apk: PathBuf::from("/pkgs/app-uiautomator.apk"),
			test_apk: PathBuf::from("/pkgs/app-uiautomator-test.apk"),
		};
		install(&bridge, "emu", &package).unwrap();

		let calls = bridge.calls();
		assert_eq!(
			calls[0],
			BridgeCall::Push {
				serial: "emu".into(),
				local: package.apk.clone(),
				remote: "/data/local/tmp/app-uiautomator.apk".into(),
			}
		);
		assert_eq!(
			calls[1],
			BridgeCall::Shell {
				serial: "emu".into(),
				args: vec!["pm", "install", "-r", "-t", "/data/local/tmp/app-uiautomator.apk"]
					.into_iter()
					.map(String::from)
					.collect(),
			}
		);
		assert_eq!(calls.len(), 4);
	}
}
