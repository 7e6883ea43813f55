//! Device fixture backed by the in-memory bridge and agent.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use uia::{Config, Device, SessionManager};
use uia_protocol::{ErrorObject, NOT_FOUND_CODE, NOT_FOUND_EXCEPTION};
use uia_runtime::testing::{FakeAgent, FakeBridge};
use uia_runtime::{PortAllocator, RetryPolicy};

pub const SERIAL: &str = "emulator-5554";

pub struct Fixture {
	pub device: Device,
	pub agent: Arc<FakeAgent>,
	pub bridge: Arc<FakeBridge>,
}

pub fn fixture() -> Fixture {
	let agent = FakeAgent::new();
	let bridge = Arc::new(FakeBridge::new(&[SERIAL]).with_agent(agent.clone()));
	let config = Config::default()
		.retry(RetryPolicy::immediate(3))
		.probe_timeout(Duration::from_millis(100));
	let manager = SessionManager::with_parts(
		config,
		bridge.clone(),
		agent.clone(),
		PortAllocator::with_probe(9008, 32764, |_| false),
	);
	let device = Device::with_manager(Arc::new(manager), SERIAL);
	agent.respond_value("deviceInfo", device_info(29, Some(true), 0));
	Fixture { device, agent, bridge }
}

pub fn device_info(sdk: u32, screen_on: Option<bool>, rotation: u8) -> Value {
	let mut info = json!({
		"currentPackageName": "com.android.launcher3",
		"displayWidth": 1080,
		"displayHeight": 1920,
		"displayRotation": rotation,
		"displaySizeDpX": 411,
		"displaySizeDpY": 731,
		"naturalOrientation": true,
		"productName": "sdk_gphone_x86",
		"sdkInt": sdk
	});
	if let Some(on) = screen_on {
		info["screenOn"] = json!(on);
	}
	info
}

pub fn not_found() -> ErrorObject {
	ErrorObject {
		code: NOT_FOUND_CODE,
		message: NOT_FOUND_EXCEPTION.to_string(),
		data: None,
	}
}

pub fn object_info(top: i32, left: i32, bottom: i32, right: i32) -> Value {
	json!({
		"bounds": {"top": top, "left": left, "bottom": bottom, "right": right},
		"className": "android.widget.TextView",
		"enabled": true,
		"clickable": true
	})
}
