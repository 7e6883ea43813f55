//! Device-wide commands.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde_json::{Value, json};
use uia::{Device, DumpOptions, KeyPress, Orientation};

use crate::cli::{Commands, ScreenArg, WaitAction};
use crate::error::{CliError, Result};

pub(super) enum DeviceCommand<'a> {
	Info { field: Option<&'a str> },
	Dump(DumpOptions),
	Screenshot { file: &'a Path, scale: f32, quality: u8 },
	Press(KeyPress),
	Tap { x: i32, y: i32 },
	Orientation { target: Option<Orientation>, freeze: Option<bool> },
	Screen(Option<ScreenArg>),
	WaitIdle(Duration),
	WaitUpdate { package: Option<&'a str>, timeout: Duration },
	Stop,
}

impl<'a> DeviceCommand<'a> {
	pub(super) fn parse(command: &'a Commands) -> Result<Self> {
		Ok(match command {
			Commands::Info { field } => Self::Info { field: field.as_deref() },
			Commands::Dump { output, no_compress, raw } => {
				let mut options = DumpOptions::default().compressed(!no_compress).pretty(!raw);
				options.path = output.clone();
				Self::Dump(options)
			}
			Commands::Screenshot { file, scale, quality } => {
				if !(*scale > 0.0 && *scale <= 1.0) {
					return Err(CliError::InvalidInput(format!("scale must be in (0, 1], got {scale}")));
				}
				Self::Screenshot {
					file,
					scale: *scale,
					quality: *quality,
				}
			}
			Commands::Press { key, meta } => Self::Press(match (key, meta) {
				(key, None) => *key,
				(KeyPress::Code { code, .. }, Some(meta)) => KeyPress::code_with_meta(*code, *meta),
				(KeyPress::Named(key), Some(_)) => {
					return Err(CliError::InvalidInput(format!("--meta needs a key code, not '{key}'")));
				}
			}),
			Commands::Tap { x, y } => Self::Tap { x: *x, y: *y },
			Commands::Orientation { value, freeze } => Self::Orientation {
				target: value
					.as_deref()
					.map(str::parse::<Orientation>)
					.transpose()
					.map_err(|e| CliError::InvalidInput(e.to_string()))?,
				freeze: *freeze,
			},
			Commands::Screen { state } => Self::Screen(*state),
			Commands::Wait(WaitAction::Idle { ms }) => Self::WaitIdle(Duration::from_millis(*ms)),
			Commands::Wait(WaitAction::Update { package, ms }) => Self::WaitUpdate {
				package: package.as_deref(),
				timeout: Duration::from_millis(*ms),
			},
			Commands::Stop => Self::Stop,
			other => {
				return Err(CliError::InvalidInput(format!(
					"'{}' is not a device command",
					super::name(other)
				)));
			}
		})
	}

	pub(super) fn execute(self, device: &Device) -> Result<Value> {
		Ok(match self {
			Self::Info { field: Some(field) } => device.info_value(field)?,
			Self::Info { field: None } => serde_json::to_value(device.info()?)?,
			Self::Dump(options) => Value::String(device.dump(&options)?),
			Self::Screenshot { file, scale, quality } => {
				if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
					fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
				}
				let saved = device
					.screenshot(file, scale, quality)?
					.ok_or_else(|| anyhow!("device produced no screenshot"))?;
				json!({ "path": saved })
			}
			Self::Press(key) => json!(device.press(key)?),
			Self::Tap { x, y } => json!(device.click(x, y)?),
			Self::Orientation { target, freeze } => {
				if let Some(target) = target {
					device.rotate(target)?;
				}
				if let Some(freeze) = freeze {
					device.freeze_rotation(freeze)?;
				}
				let current = device.orientation()?;
				json!({ "orientation": current.name(), "degrees": current.degrees() })
			}
			Self::Screen(Some(ScreenArg::On)) => {
				device.screen().on()?;
				json!("on")
			}
			Self::Screen(Some(ScreenArg::Off)) => {
				device.screen().off()?;
				json!("off")
			}
			Self::Screen(None) => json!(device.screen().state()?.as_str()),
			Self::WaitIdle(timeout) => json!(device.wait_idle(timeout)?),
			Self::WaitUpdate { package, timeout } => json!(device.wait_update(timeout, package)?),
			Self::Stop => {
				device.stop()?;
				json!("stopped")
			}
		})
	}
}
