//! Watcher management.

use serde_json::{Value, json};
use uia::Device;

use crate::cli::WatchersAction;
use crate::error::Result;

pub(super) fn execute(device: &Device, action: &WatchersAction) -> Result<Value> {
	let watchers = device.watchers();
	Ok(match action {
		WatchersAction::List => json!(watchers.list()?),
		WatchersAction::Remove { all: true, .. } => {
			let names = watchers.list()?;
			watchers.remove_all()?;
			json!(names)
		}
		WatchersAction::Remove { name: Some(name), .. } => {
			watchers.remove(name)?;
			json!([name])
		}
		WatchersAction::Remove { name: None, all: false } => json!([]),
		WatchersAction::Reset => {
			watchers.reset()?;
			json!("reset")
		}
		WatchersAction::Run => {
			watchers.run()?;
			json!(watchers.triggered()?)
		}
		WatchersAction::Triggered => json!(watchers.triggered()?),
	})
}
