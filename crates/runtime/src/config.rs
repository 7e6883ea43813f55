//! Runtime configuration.
//!
//! [`Config::from_env`] reads the process environment; [`Config::from_lookup`]
//! takes any lookup function so callers (and tests) can supply their own
//! source. Builder methods override individual fields afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Port the agent listens on, on the device side.
pub const DEVICE_PORT: u16 = 9008;
/// First local port tried by the allocator.
pub const LOCAL_PORT_BASE: u16 = 9008;
/// Last local port tried before wrapping back to [`LOCAL_PORT_BASE`].
pub const LOCAL_PORT_CEILING: u16 = 32764;
/// Default per-call RPC timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(90);
/// Timeout for a single liveness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Agent build this client speaks to.
pub const AGENT_VERSION: &str = "1.1.7";

pub const ENV_SERIAL: &str = "ANDROID_SERIAL";
pub const ENV_ADB_HOST: &str = "ANDROID_ADB_SERVER_HOST";
pub const ENV_ADB_PORT: &str = "ANDROID_ADB_SERVER_PORT";
pub const ENV_ADB_PATH: &str = "UIA_ADB_PATH";
pub const ENV_LOCAL_PORT: &str = "UIA_LOCAL_PORT";
pub const ENV_RPC_TIMEOUT: &str = "UIA_JSONRPC_TIMEOUT";
pub const ENV_AGENT_APK: &str = "UIA_AGENT_APK";
pub const ENV_AGENT_TEST_APK: &str = "UIA_AGENT_TEST_APK";
pub const ENV_AGENT_DIR: &str = "UIA_AGENT_DIR";

/// Bounded retry schedule used while waiting for a freshly started agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub attempts: u32,
	pub initial_backoff: Duration,
	pub max_backoff: Duration,
}

impl RetryPolicy {
	/// Backoff before attempt `n` (zero-based), doubling and capped.
	pub fn backoff(&self, n: u32) -> Duration {
		let factor = 1u32.checked_shl(n.min(16)).unwrap_or(u32::MAX);
		self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
	}

	/// A policy that never sleeps.
	pub fn immediate(attempts: u32) -> Self {
		Self {
			attempts,
			initial_backoff: Duration::ZERO,
			max_backoff: Duration::ZERO,
		}
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			attempts: 30,
			initial_backoff: Duration::from_millis(100),
			max_backoff: Duration::from_secs(1),
		}
	}
}

/// Where to find the agent packages when they need installing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
	pub apk: Option<PathBuf>,
	pub test_apk: Option<PathBuf>,
	pub dir: Option<PathBuf>,
	pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub serial: Option<String>,
	pub adb_host: Option<String>,
	pub adb_port: Option<u16>,
	pub adb_path: Option<PathBuf>,
	pub local_port: Option<u16>,
	pub rpc_timeout: Duration,
	pub probe_timeout: Duration,
	pub retry: RetryPolicy,
	pub agent: AgentConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			serial: None,
			adb_host: None,
			adb_port: None,
			adb_path: None,
			local_port: None,
			rpc_timeout: DEFAULT_RPC_TIMEOUT,
			probe_timeout: DEFAULT_PROBE_TIMEOUT,
			retry: RetryPolicy::default(),
			agent: AgentConfig {
				version: AGENT_VERSION.to_string(),
				..AgentConfig::default()
			},
		}
	}
}

impl Config {
	/// Reads the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a config from `lookup`. Empty values count as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
		let mut config = Self::default();

		config.serial = get(ENV_SERIAL);
		config.adb_host = get(ENV_ADB_HOST);
		config.adb_port = get(ENV_ADB_PORT).map(|v| parse_number(ENV_ADB_PORT, &v)).transpose()?;
		config.adb_path = get(ENV_ADB_PATH).map(PathBuf::from);
		config.local_port = get(ENV_LOCAL_PORT).map(|v| parse_number(ENV_LOCAL_PORT, &v)).transpose()?;
		if let Some(secs) = get(ENV_RPC_TIMEOUT) {
			config.rpc_timeout = Duration::from_secs(parse_number(ENV_RPC_TIMEOUT, &secs)?);
		}
		config.agent.apk = get(ENV_AGENT_APK).map(PathBuf::from);
		config.agent.test_apk = get(ENV_AGENT_TEST_APK).map(PathBuf::from);
		config.agent.dir = get(ENV_AGENT_DIR).map(PathBuf::from);

		Ok(config)
	}

	pub fn serial(mut self, serial: impl Into<String>) -> Self {
		self.serial = Some(serial.into());
		self
	}

	pub fn adb_server(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
		self.adb_host = Some(host.into());
		self.adb_port = port;
		self
	}

	pub fn adb_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.adb_path = Some(path.into());
		self
	}

	pub fn local_port(mut self, port: u16) -> Self {
		self.local_port = Some(port);
		self
	}

	pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
		self.rpc_timeout = timeout;
		self
	}

	pub fn probe_timeout(mut self, timeout: Duration) -> Self {
		self.probe_timeout = timeout;
		self
	}

	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn agent_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.agent.dir = Some(dir.into());
		self
	}

	pub fn agent_version(mut self, version: impl Into<String>) -> Self {
		self.agent.version = version.into();
		self
	}

	/// Host where forwarded ports are reachable: the adb server host, or loopback.
	pub fn forward_host(&self) -> &str {
		self.adb_host.as_deref().unwrap_or("127.0.0.1")
	}
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
	value
		.parse()
		.map_err(|_| Error::InvalidArgument(format!("{key}={value} is not a valid number")))
}
