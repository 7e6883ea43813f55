mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use common::{SERIAL, device_info, fixture, not_found};
use serde_json::json;
use tempfile::TempDir;
use uia::{DumpOptions, Error, Key, KeyPress, Orientation, Point, ScreenState, Selector, UiElement};
use uia_runtime::testing::BridgeCall;

#[test]
fn test_first_call_starts_agent() {
	let fx = fixture();
	assert!(!fx.agent.is_alive());

	let info = fx.device.info().unwrap();
	assert_eq!(info.display_width, 1080);
	assert_eq!(fx.bridge.starts(), 1);

	fx.device.info().unwrap();
	assert_eq!(fx.bridge.starts(), 1);
	assert_eq!(fx.agent.call_count("deviceInfo"), 2);
}

#[test]
fn test_info_value_aliases() {
	let fx = fixture();
	assert_eq!(fx.device.info_value("width").unwrap(), json!(1080));
	assert_eq!(fx.device.info_value("sdkInt").unwrap(), json!(29));
	assert!(matches!(fx.device.info_value("colour"), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_exists_is_false_where_click_fails() {
	let fx = fixture();
	fx.agent.respond_value("exist", json!(false));
	fx.agent.respond("click", |_| Err(not_found()));

	let selector = Selector::new().text("Missing");
	assert!(!fx.device.exists(&selector).unwrap());

	let err = fx.device.find(selector).click().unwrap_err();
	assert!(err.is_not_found(), "{err:?}");
}

#[test]
fn test_handler_retries_failed_call() {
	let fx = fixture();
	let clicks = Arc::new(AtomicUsize::new(0));
	let seen = clicks.clone();
	fx.agent.respond("click", move |_| {
		if seen.fetch_add(1, Ordering::SeqCst) == 0 { Err(not_found()) } else { Ok(json!(true)) }
	});
	fx.agent.respond_value("pressKey", json!(true));

	let runs = Arc::new(AtomicUsize::new(0));
	let counter = runs.clone();
	fx.device.handlers().on(move |device| {
		counter.fetch_add(1, Ordering::SeqCst);
		device.press(Key::Back).unwrap();
		true
	});

	assert!(fx.device.find(Selector::new().text("OK")).click().unwrap());
	assert_eq!(runs.load(Ordering::SeqCst), 1);
	assert_eq!(fx.agent.call_count("click"), 2);
	assert_eq!(fx.agent.calls("pressKey"), vec![vec![json!("back")]]);
}

#[test]
fn test_handlers_stop_at_first_true() {
	let fx = fixture();
	fx.agent.respond("click", |_| Err(not_found()));

	let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
	for (label, outcome) in [("a", false), ("b", true), ("c", true)] {
		let order = order.clone();
		fx.device.handlers().on(move |_| {
			order.lock().push(label);
			outcome
		});
	}

	let err = fx.device.find(Selector::new().text("OK")).click().unwrap_err();
	assert!(err.is_not_found());
	assert_eq!(*order.lock(), vec!["a", "b"]);
	assert_eq!(fx.agent.call_count("click"), 2);
}

#[test]
fn test_handler_removed_with_off() {
	let fx = fixture();
	fx.agent.respond("click", |_| Err(not_found()));

	let id = fx.device.handlers().on(|_| true);
	assert_eq!(fx.device.handlers().len(), 1);
	assert!(fx.device.handlers().off(id));
	assert!(fx.device.handlers().is_empty());

	fx.device.find(Selector::new().text("OK")).click().unwrap_err();
	assert_eq!(fx.agent.call_count("click"), 1);
}

#[test]
fn test_handlers_run_for_each_thread() {
	let fx = fixture();
	fx.agent.respond("click", |_| Err(not_found()));

	let entered = Arc::new(AtomicBool::new(false));
	let runs = Arc::new(AtomicUsize::new(0));
	{
		let (entered, runs) = (entered.clone(), runs.clone());
		fx.device.handlers().on(move |_| {
			let first = runs.fetch_add(1, Ordering::SeqCst) == 0;
			if first {
				entered.store(true, Ordering::SeqCst);
				let deadline = Instant::now() + Duration::from_secs(2);
				while runs.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
					thread::sleep(Duration::from_millis(5));
				}
			}
			false
		});
	}

	let device = &fx.device;
	thread::scope(|scope| {
		let busy = scope.spawn(|| device.find(Selector::new().text("OK")).click().unwrap_err());
		let other = scope.spawn(|| {
			while !entered.load(Ordering::SeqCst) {
				thread::sleep(Duration::from_millis(1));
			}
			device.find(Selector::new().text("Cancel")).click().unwrap_err()
		});
		assert!(busy.join().unwrap().is_not_found());
		assert!(other.join().unwrap().is_not_found());
	});

	assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_transport_failure_reissues_call() {
	let fx = fixture();
	fx.agent.respond_value("pressKey", json!(true));
	fx.device.info().unwrap();

	fx.agent.fail_transport_once("pressKey");
	assert!(fx.device.press(Key::Home).unwrap());
	assert_eq!(fx.agent.calls("pressKey"), vec![vec![json!("home")]]);
	// The agent still answered, so the session was adopted, not restarted.
	assert_eq!(fx.bridge.starts(), 1);
}

#[test]
fn test_transport_failure_restarts_dead_agent() {
	let fx = fixture();
	fx.device.info().unwrap();

	fx.agent.set_alive(false);
	let info = fx.device.info().unwrap();
	assert_eq!(info.sdk_int, 29);
	assert_eq!(fx.bridge.starts(), 2);
}

#[test]
fn test_press_named_and_codes() {
	let fx = fixture();
	fx.agent.respond_value("pressKey", json!(true));
	fx.agent.respond_value("pressKeyCode", json!(true));

	fx.device.press(Key::VolumeUp).unwrap();
	fx.device.press(KeyPress::code(0x07)).unwrap();
	fx.device.press(KeyPress::code_with_meta(0x1d, 0x01)).unwrap();

	assert_eq!(fx.agent.calls("pressKey"), vec![vec![json!("volume_up")]]);
	assert_eq!(
		fx.agent.calls("pressKeyCode"),
		vec![vec![json!(7)], vec![json!(29), json!(1)]]
	);
}

#[test]
fn test_gestures_on_coordinates() {
	let fx = fixture();
	for method in ["click", "swipe", "swipePoints", "drag"] {
		fx.agent.respond_value(method, json!(true));
	}

	fx.device.click(100, 200).unwrap();
	fx.device.long_click(50, 60).unwrap();
	fx.device.swipe_points(&[Point::new(1, 2), Point::new(3, 4)], 20).unwrap();
	fx.device.drag(0, 0, 10, 10, 30).unwrap();

	assert_eq!(fx.agent.calls("click"), vec![vec![json!(100), json!(200)]]);
	assert_eq!(
		fx.agent.calls("swipe"),
		vec![vec![json!(50), json!(60), json!(51), json!(61), json!(100)]]
	);
	assert_eq!(fx.agent.calls("swipePoints"), vec![vec![json!([1, 2, 3, 4]), json!(20)]]);
	assert_eq!(
		fx.agent.calls("drag"),
		vec![vec![json!(0), json!(0), json!(10), json!(10), json!(30)]]
	);
}

#[test]
fn test_orientation_round_trip() {
	let fx = fixture();
	fx.agent.respond_value("deviceInfo", device_info(29, Some(true), 1));
	fx.agent.respond_value("setOrientation", json!(null));

	assert_eq!(fx.device.orientation().unwrap(), Orientation::Left);

	fx.device.set_orientation("r").unwrap();
	fx.device.set_orientation("180").unwrap();
	fx.device.rotate(Orientation::Natural).unwrap();
	assert_eq!(
		fx.agent.calls("setOrientation"),
		vec![vec![json!("right")], vec![json!("upsidedown")], vec![json!("natural")]]
	);
}

#[test]
fn test_orientation_rejects_unknown_token() {
	let fx = fixture();
	let err = fx.device.set_orientation("sideways").unwrap_err();
	assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
	assert_eq!(fx.agent.call_count("setOrientation"), 0);
}

#[test]
fn test_screen_state() {
	let fx = fixture();
	fx.agent.respond_value("wakeUp", json!(null));
	fx.agent.respond_value("sleep", json!(null));

	assert_eq!(fx.device.screen().state().unwrap(), ScreenState::On);
	assert!(fx.device.screen().is("ON").unwrap());
	assert!(!fx.device.screen().is("off").unwrap());
	assert!(matches!(fx.device.screen().is("dim"), Err(Error::InvalidArgument(_))));

	fx.device.screen().set("off").unwrap();
	fx.device.screen().on().unwrap();
	assert_eq!(fx.agent.call_count("sleep"), 1);
	assert_eq!(fx.agent.call_count("wakeUp"), 1);
}

#[test]
fn test_screen_state_unsupported_on_old_platforms() {
	let fx = fixture();
	fx.agent.respond_value("deviceInfo", device_info(17, None, 0));
	let err = fx.device.screen().state().unwrap_err();
	assert!(matches!(err, Error::Unsupported(_)), "{err:?}");
}

#[test]
fn test_waits_pass_timeout_in_millis() {
	let fx = fixture();
	fx.agent.respond_value("waitForIdle", json!(true));
	fx.agent.respond_value("waitForWindowUpdate", json!(false));

	assert!(fx.device.wait_idle(Duration::from_secs(2)).unwrap());
	assert!(!fx.device.wait_update(Duration::from_millis(500), Some("com.android.settings")).unwrap());
	assert!(!fx.device.wait_update(Duration::from_millis(500), None).unwrap());

	assert_eq!(fx.agent.calls("waitForIdle"), vec![vec![json!(2000)]]);
	assert_eq!(
		fx.agent.calls("waitForWindowUpdate"),
		vec![vec![json!("com.android.settings"), json!(500)], vec![json!(null), json!(500)]]
	);
}

#[test]
fn test_screenshot_over_http() {
	let fx = fixture();
	fx.agent.serve("/screenshot/0", b"\x89PNG-bytes".to_vec());
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("shot.png");

	let saved = fx.device.screenshot(&path, 0.5, 80).unwrap();
	assert_eq!(saved.as_deref(), Some(path.as_path()));
	assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG-bytes");
	assert_eq!(fx.agent.gets(), vec!["/screenshot/0?scale=0.5&quality=80".to_string()]);
	assert_eq!(fx.agent.call_count("takeScreenshot"), 0);
}

#[test]
fn test_screenshot_falls_back_to_pull() {
	let fx = fixture();
	fx.agent.respond_value("deviceInfo", device_info(17, None, 0));
	let remote = "/data/local/tmp/screenshot.png";
	fx.agent.respond_value("takeScreenshot", json!(remote));
	fx.bridge.add_remote_file(remote, b"png".to_vec());
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("shot.png");

	let saved = fx.device.screenshot(&path, 1.0, 100).unwrap();
	assert_eq!(saved.as_deref(), Some(path.as_path()));
	assert_eq!(std::fs::read(&path).unwrap(), b"png");
	assert!(fx.agent.gets().is_empty());
	assert_eq!(fx.bridge.shell_calls("rm"), vec![vec!["rm".to_string(), remote.to_string()]]);
	assert!(!fx.bridge.has_remote_file(remote));
}

#[test]
fn test_screenshot_cleans_up_when_pull_fails() {
	let fx = fixture();
	fx.agent.respond_value("deviceInfo", device_info(17, None, 0));
	let remote = "/data/local/tmp/screenshot.png";
	fx.agent.respond_value("takeScreenshot", json!(remote));
	let dir = TempDir::new().unwrap();

	let saved = fx.device.screenshot(dir.path().join("shot.png"), 1.0, 100).unwrap();
	assert_eq!(saved, None);
	assert!(fx.bridge.calls().iter().any(|c| matches!(c, BridgeCall::Pull { serial, .. } if serial == SERIAL)));
	assert_eq!(fx.bridge.shell_calls("rm").len(), 1);
}

#[test]
fn test_screenshot_none_when_agent_declines() {
	let fx = fixture();
	fx.agent.respond_value("deviceInfo", device_info(16, None, 0));
	fx.agent.respond_value("takeScreenshot", json!(null));
	let dir = TempDir::new().unwrap();

	assert_eq!(fx.device.screenshot(dir.path().join("shot.png"), 1.0, 100).unwrap(), None);
	assert!(fx.bridge.shell_calls("rm").is_empty());
}

#[test]
fn test_dump_writes_raw_and_returns_pretty() {
	let fx = fixture();
	let raw = r#"<?xml version="1.0"?><hierarchy rotation="0"><node text="A"/></hierarchy>"#;
	fx.agent.respond_value("dumpWindowHierarchy", json!(raw));
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("window.xml");

	let pretty = fx.device.dump(&DumpOptions::default().path(&path)).unwrap();
	assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
	assert!(pretty.contains("\n  <node text=\"A\"/>\n"), "{pretty}");
	assert_eq!(fx.agent.calls("dumpWindowHierarchy"), vec![vec![json!(true), json!(null)]]);

	let plain = fx.device.dump(&DumpOptions::default().pretty(false).compressed(false)).unwrap();
	assert_eq!(plain, raw);
	assert_eq!(fx.agent.calls("dumpWindowHierarchy")[1], vec![json!(false), json!(null)]);
}

#[test]
fn test_watchers_registration() {
	let fx = fixture();
	for method in ["registerClickUiObjectWatcher", "registerPressKeyskWatcher", "removeWatcher", "resetWatcherTriggers", "runWatchers"] {
		fx.agent.respond_value(method, json!(null));
	}
	fx.agent.respond_value("getWatchers", json!(["dialog", "crash"]));
	fx.agent.respond_value("hasWatcherTriggered", json!(true));

	fx.device
		.watcher("dialog")
		.when(Selector::new().text("Allow?"))
		.click(&Selector::new().text("Allow"))
		.unwrap();
	fx.device
		.watcher("crash")
		.when(Selector::new().text_contains("has stopped"))
		.press(&[Key::Back, Key::Home])
		.unwrap();

	assert_eq!(
		fx.agent.calls("registerClickUiObjectWatcher"),
		vec![vec![json!("dialog"), json!([{"text": "Allow?"}]), json!({"text": "Allow"})]]
	);
	assert_eq!(
		fx.agent.calls("registerPressKeyskWatcher"),
		vec![vec![json!("crash"), json!([{"textContains": "has stopped"}]), json!(["back", "home"])]]
	);

	assert!(fx.device.watcher("dialog").triggered().unwrap());
	assert_eq!(fx.device.watchers().list().unwrap(), vec!["dialog", "crash"]);
	fx.device.watchers().reset().unwrap();
	fx.device.watchers().run().unwrap();
	fx.device.watchers().remove_all().unwrap();
	assert_eq!(fx.agent.calls("removeWatcher"), vec![vec![json!("dialog")], vec![json!("crash")]]);
}

#[test]
fn test_stop_shuts_agent_down() {
	let fx = fixture();
	fx.device.info().unwrap();

	fx.device.stop().unwrap();
	assert!(!fx.agent.is_alive());
	assert_eq!(fx.agent.gets(), vec!["/stop".to_string()]);
	assert!(fx.bridge.forwards().is_empty());
}
