//! Device bridge client.
//!
//! [`Bridge`] is the seam between the session layer and the `adb` command
//! line. [`Adb`] shells out to the real executable; tests substitute
//! [`FakeBridge`](crate::testing::FakeBridge).

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

use tracing::debug;

use crate::config::{Config, ENV_ADB_PATH};
use crate::error::{Error, Result};

/// One line of `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
	pub serial: String,
	/// `device`, `offline`, `unauthorized`, ...
	pub state: String,
}

impl DeviceEntry {
	pub fn is_online(&self) -> bool {
		self.state == "device"
	}
}

/// One line of `adb forward --list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardSpec {
	pub local: u16,
	pub remote: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardEntry {
	pub serial: String,
	pub spec: ForwardSpec,
}

/// Captured result of `adb shell`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
	pub stdout: String,
	pub stderr: String,
	pub status: Option<i32>,
}

impl ShellOutput {
	pub fn success(&self) -> bool {
		self.status == Some(0)
	}
}

/// A long-running device process started through the bridge.
pub trait ProcessHandle: Send + std::fmt::Debug {
	fn id(&self) -> Option<u32>;

	/// Returns false once the process has exited.
	fn is_running(&mut self) -> bool;

	fn kill(&mut self) -> Result<()>;
}

/// Operations the session layer needs from the device bridge.
pub trait Bridge: Send + Sync {
	fn devices(&self) -> Result<Vec<DeviceEntry>>;

	fn forward(&self, serial: &str, local: u16, remote: u16) -> Result<()>;

	fn remove_forward(&self, serial: &str, local: u16) -> Result<()>;

	/// Forwards of every attached device.
	fn forward_list(&self) -> Result<Vec<ForwardEntry>>;

	fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()>;

	fn pull(&self, serial: &str, remote: &str, local: &Path) -> Result<()>;

	fn shell(&self, serial: &str, args: &[&str]) -> Result<ShellOutput>;

	/// Starts `adb shell <args>` without waiting for it.
	fn spawn(&self, serial: &str, args: &[&str]) -> Result<Box<dyn ProcessHandle>>;
}

/// Picks the device to talk to.
///
/// An explicit serial must be attached and online. Without one, exactly one
/// online device must be attached.
pub fn resolve_serial(bridge: &dyn Bridge, requested: Option<&str>) -> Result<String> {
	let online: Vec<String> = bridge
		.devices()?
		.into_iter()
		.filter(DeviceEntry::is_online)
		.map(|d| d.serial)
		.collect();

	match requested {
		Some(serial) if online.iter().any(|s| s == serial) => Ok(serial.to_string()),
		Some(serial) => Err(Error::DeviceNotFound(serial.to_string())),
		None => match online.as_slice() {
			[] => Err(Error::DeviceNotFound("no device attached".to_string())),
			[only] => Ok(only.clone()),
			_ => Err(Error::MultipleDevices(online)),
		},
	}
}

/// Parses `adb devices` output.
pub fn parse_devices(output: &str) -> Vec<DeviceEntry> {
	output
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*'))
		.filter_map(|line| {
			let mut parts = line.split_whitespace();
			let serial = parts.next()?;
			let state = parts.next()?;
			Some(DeviceEntry {
				serial: serial.to_string(),
				state: state.to_string(),
			})
		})
		.collect()
}

/// Parses `adb forward --list` output. Non-tcp forwards are skipped.
pub fn parse_forward_list(output: &str) -> Vec<ForwardEntry> {
	output
		.lines()
		.filter_map(|line| {
			let mut parts = line.split_whitespace();
			let serial = parts.next()?;
			let local = parts.next()?.strip_prefix("tcp:")?.parse().ok()?;
			let remote = parts.next()?.strip_prefix("tcp:")?.parse().ok()?;
			Some(ForwardEntry {
				serial: serial.to_string(),
				spec: ForwardSpec { local, remote },
			})
		})
		.collect()
}

/// Locates the `adb` executable.
///
/// Search order:
/// 1. Explicit path (`UIA_ADB_PATH`)
/// 2. `$ANDROID_HOME/platform-tools/adb`
/// 3. `adb` on `PATH`
pub fn find_adb(explicit: Option<&Path>, android_home: Option<&Path>) -> Result<PathBuf> {
	if let Some(path) = explicit {
		if path.is_file() {
			return Ok(path.to_path_buf());
		}
		return Err(Error::Bridge(format!("{ENV_ADB_PATH} points to missing file {}", path.display())));
	}

	if let Some(home) = android_home {
		let name = if cfg!(windows) { "adb.exe" } else { "adb" };
		let candidate = home.join("platform-tools").join(name);
		if candidate.is_file() {
			return Ok(candidate);
		}
		debug!(target = "uia", path = %candidate.display(), "adb not found under ANDROID_HOME");
	}

	which::which("adb")
		.map_err(|_| Error::Bridge(format!("adb executable not found; set {ENV_ADB_PATH} or ANDROID_HOME")))
}

/// [`Bridge`] backed by the `adb` executable.
#[derive(Debug, Clone)]
pub struct Adb {
	program: PathBuf,
	server_host: Option<String>,
	server_port: Option<u16>,
}

impl Adb {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			server_host: None,
			server_port: None,
		}
	}

	/// Finds `adb` and applies the remote server settings from `config`.
	pub fn from_config(config: &Config) -> Result<Self> {
		let android_home = std::env::var_os("ANDROID_HOME").map(PathBuf::from);
		let program = find_adb(config.adb_path.as_deref(), android_home.as_deref())?;
		Ok(Self {
			program,
			server_host: config.adb_host.clone(),
			server_port: config.adb_port,
		})
	}

	pub fn program(&self) -> &Path {
		&self.program
	}

	fn command(&self, serial: Option<&str>) -> Command {
		let mut cmd = Command::new(&self.program);
		if let Some(host) = &self.server_host {
			cmd.args(["-H", host]);
		}
		if let Some(port) = self.server_port {
			cmd.arg("-P").arg(port.to_string());
		}
		if let Some(serial) = serial {
			cmd.args(["-s", serial]);
		}
		cmd
	}

	fn output(&self, serial: Option<&str>, args: &[&str]) -> Result<Output> {
		debug!(target = "uia", serial, ?args, "adb");
		self.command(serial)
			.args(args)
			.stdin(Stdio::null())
			.output()
			.map_err(|e| Error::Bridge(format!("failed to run {}: {e}", self.program.display())))
	}

	fn checked(&self, serial: Option<&str>, args: &[&str]) -> Result<String> {
		let output = self.output(serial, args)?;
		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			return Err(Error::Bridge(format!("adb {} failed: {}", args.join(" "), stderr.trim())));
		}
		Ok(String::from_utf8_lossy(&output.stdout).into_owned())
	}
}

impl Bridge for Adb {
	fn devices(&self) -> Result<Vec<DeviceEntry>> {
		self.checked(None, &["devices"]).map(|out| parse_devices(&out))
	}

	fn forward(&self, serial: &str, local: u16, remote: u16) -> Result<()> {
		let local = format!("tcp:{local}");
		let remote = format!("tcp:{remote}");
		self.checked(Some(serial), &["forward", &local, &remote]).map(drop)
	}

	fn remove_forward(&self, serial: &str, local: u16) -> Result<()> {
		let local = format!("tcp:{local}");
		self.checked(Some(serial), &["forward", "--remove", &local]).map(drop)
	}

	fn forward_list(&self) -> Result<Vec<ForwardEntry>> {
		self.checked(None, &["forward", "--list"]).map(|out| parse_forward_list(&out))
	}

	fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()> {
		let local = local.to_string_lossy();
		self.checked(Some(serial), &["push", &local, remote]).map(drop)
	}

	fn pull(&self, serial: &str, remote: &str, local: &Path) -> Result<()> {
		let local = local.to_string_lossy();
		self.checked(Some(serial), &["pull", remote, &local]).map(drop)
	}

	fn shell(&self, serial: &str, args: &[&str]) -> Result<ShellOutput> {
		let mut full = vec!["shell"];
		full.extend_from_slice(args);
		let output = self.output(Some(serial), &full)?;
		Ok(ShellOutput {
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
			status: output.status.code(),
		})
	}

	fn spawn(&self, serial: &str, args: &[&str]) -> Result<Box<dyn ProcessHandle>> {
		debug!(target = "uia", serial, ?args, "adb shell (background)");
		let child = self
			.command(Some(serial))
			.arg("shell")
			.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
			.map_err(|e| Error::Bridge(format!("failed to spawn {}: {e}", self.program.display())))?;
		Ok(Box::new(ChildProcess(child)))
	}
}

/// [`ProcessHandle`] over a local `adb shell` child process.
#[derive(Debug)]
pub struct ChildProcess(Child);

impl ProcessHandle for ChildProcess {
	fn id(&self) -> Option<u32> {
		Some(self.0.id())
	}

	fn is_running(&mut self) -> bool {
		matches!(self.0.try_wait(), Ok(None))
	}

	fn kill(&mut self) -> Result<()> {
		if self.is_running() {
			self.0.kill()?;
		}
		self.0.wait()?;
		Ok(())
	}
}
