mod common;

use std::time::Duration;

use common::{fixture, not_found, object_info};
use serde_json::{Value, json};
use uia::{Axis, Corner, Direction, Error, Fling, Point, Scroll, Selector, UiElement};

fn instance_of(params: &[Value]) -> Option<u64> {
	params[0].get("instance").and_then(Value::as_u64)
}

#[test]
fn test_selector_is_sent_verbatim() {
	let fx = fixture();
	fx.agent.respond_value("click", json!(true));

	let button = fx.device.find(Selector::new().class_name("android.widget.Button").text("OK"));
	button.click().unwrap();
	button.click_corner(Corner::BottomRight).unwrap();

	assert_eq!(
		fx.agent.calls("click"),
		vec![
			vec![json!({"className": "android.widget.Button", "text": "OK"})],
			vec![json!({"className": "android.widget.Button", "text": "OK"}), json!("br")],
		]
	);
}

#[test]
fn test_child_and_sibling_nest() {
	let fx = fixture();
	fx.agent.respond_value("exist", json!(true));

	let list = fx.device.find(Selector::new().resource_id("android:id/list"));
	let row = list.child(Selector::new().text("Wi-Fi").sibling(Selector::new().class_name("android.widget.Switch")));
	assert!(row.exists().unwrap());

	let both = list.child(Selector::new().text("Wi-Fi")).sibling(Selector::new().text("Network"));
	assert!(both.exists().unwrap());

	let calls = fx.agent.calls("exist");
	assert_eq!(
		calls[0][0],
		json!({
			"resourceId": "android:id/list",
			"childSelector": {
				"text": "Wi-Fi",
				"fromParent": {"className": "android.widget.Switch"}
			}
		})
	);
	assert_eq!(
		calls[1][0],
		json!({
			"resourceId": "android:id/list",
			"childSelector": {"text": "Wi-Fi"},
			"fromParent": {"text": "Network"}
		})
	);
}

#[test]
fn test_set_text_empty_clears() {
	let fx = fixture();
	fx.agent.respond_value("setText", json!(true));
	fx.agent.respond_value("clearTextField", json!(null));

	let field = fx.device.find(Selector::new().class_name("android.widget.EditText"));
	assert!(field.set_text("hello").unwrap());
	assert!(field.set_text("").unwrap());

	assert_eq!(fx.agent.calls("setText").len(), 1);
	assert_eq!(fx.agent.calls("setText")[0][1], json!("hello"));
	assert_eq!(fx.agent.call_count("clearTextField"), 1);
}

#[test]
fn test_long_click_falls_back_to_press_at_bounds() {
	let fx = fixture();
	fx.agent.respond_value("objInfo", object_info(0, 0, 60, 120));
	fx.agent.respond_value("swipe", json!(true));

	let label = fx.device.find(Selector::new().text("Label"));
	label.long_click(None).unwrap();
	label.long_click(Some(Corner::TopLeft)).unwrap();

	assert_eq!(fx.agent.call_count("longClick"), 0);
	assert_eq!(
		fx.agent.calls("swipe"),
		vec![
			vec![json!(60), json!(30), json!(61), json!(31), json!(100)],
			vec![json!(20), json!(10), json!(21), json!(11), json!(100)],
		]
	);
}

#[test]
fn test_long_click_uses_agent_when_supported() {
	let fx = fixture();
	let mut info = object_info(0, 0, 60, 120);
	info["longClickable"] = json!(true);
	fx.agent.respond_value("objInfo", info);
	fx.agent.respond_value("longClick", json!(true));

	fx.device.find(Selector::new().text("Item")).long_click(Some(Corner::BottomRight)).unwrap();
	assert_eq!(fx.agent.calls("longClick"), vec![vec![json!({"text": "Item"}), json!("br")]]);
}

#[test]
fn test_info_value_description_alias() {
	let fx = fixture();
	let mut info = object_info(0, 0, 10, 10);
	info["contentDescription"] = json!("Search");
	fx.agent.respond_value("objInfo", info);

	let icon = fx.device.find(Selector::new().resource_id("search"));
	assert_eq!(icon.info_value("description").unwrap(), json!("Search"));
	assert!(matches!(icon.info_value("colour"), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_nth_and_all() {
	let fx = fixture();
	fx.agent.respond_value("count", json!(3));

	let rows = fx.device.find(Selector::new().class_name("android.widget.TextView"));
	let second = rows.nth(1).unwrap();
	assert_eq!(second.selector(), &rows.selector().instance(1));

	let all = rows.all().unwrap();
	assert_eq!(all.len(), 3);
	assert_eq!(all[2].selector(), &rows.selector().instance(2));

	let err = rows.nth(3).unwrap_err();
	assert!(matches!(err, Error::ElementNotFound(_)), "{err:?}");
}

#[test]
fn test_nth_single_match_keeps_selector() {
	let fx = fixture();
	fx.agent.respond_value("count", json!(1));

	let only = fx.device.find(Selector::new().text("Only"));
	assert_eq!(only.nth(0).unwrap().selector(), only.selector());
	assert!(fx.device.find(Selector::new().text("Only")).all().unwrap().len() == 1);
}

#[test]
fn test_relative_position_picks_nearest() {
	let fx = fixture();
	// Origin at left 0..100; candidates at instance 0 (far right), 1 (near right), 2 (below).
	fx.agent.respond("objInfo", |params| {
		Ok(match (params[0].get("text").and_then(Value::as_str), instance_of(params)) {
			(Some("Name"), _) => object_info(100, 0, 200, 100),
			(_, Some(0)) => object_info(100, 400, 200, 500),
			(_, Some(1)) => object_info(120, 150, 180, 250),
			_ => object_info(300, 0, 400, 100),
		})
	});
	fx.agent.respond_value("count", json!(3));

	let name = fx.device.find(Selector::new().text("Name"));
	let field = Selector::new().class_name("android.widget.EditText");

	let right = name.right(&field).unwrap().unwrap();
	assert_eq!(right.selector(), &field.instance(1));

	let below = name.down(&field).unwrap().unwrap();
	assert_eq!(below.selector(), &field.instance(2));

	assert!(name.left(&field).unwrap().is_none());
	assert!(name.up(&field).unwrap().is_none());
}

#[test]
fn test_child_by_text_returns_named_object() {
	let fx = fixture();
	fx.agent.respond_value("childByText", json!("obj-1"));
	fx.agent.respond_value("getChild", json!("obj-2"));
	fx.agent.respond_value("click", json!(true));

	let list = fx.device.find(Selector::new().scrollable(true));
	let row_selector = Selector::new().class_name("android.widget.LinearLayout");
	let row = list.child_by_text(&row_selector, "Bluetooth", Some(true)).unwrap();
	assert_eq!(row.name(), "obj-1");
	assert_eq!(
		fx.agent.calls("childByText"),
		vec![vec![json!({"scrollable": true}), json!({"className": "android.widget.LinearLayout"}), json!("Bluetooth"), json!(true)]]
	);

	let toggle = row.child(&Selector::new().class_name("android.widget.Switch")).unwrap();
	assert_eq!(toggle.name(), "obj-2");
	toggle.click().unwrap();
	assert_eq!(fx.agent.calls("click"), vec![vec![json!("obj-2")]]);
}

#[test]
fn test_stale_named_object_is_not_found() {
	let fx = fixture();
	fx.agent.respond_value("childByInstance", json!("obj-9"));
	fx.agent.respond("objInfo", |params| {
		if params[0] == json!("obj-9") { Err(not_found()) } else { Ok(object_info(0, 0, 1, 1)) }
	});

	let named = fx
		.device
		.find(Selector::new().scrollable(true))
		.child_by_instance(&Selector::new().text("x"), 3)
		.unwrap();
	let err = named.info().unwrap_err();
	assert!(matches!(err, Error::ElementNotFound(_)), "{err:?}");
}

#[test]
fn test_forgotten_named_object_does_not_exist() {
	let fx = fixture();
	fx.agent.respond_value("childByInstance", json!("obj-9"));
	fx.agent.respond("exist", |_| Err(not_found()));
	fx.agent.respond("waitUntilGone", |_| Err(not_found()));

	let named = fx
		.device
		.find(Selector::new().scrollable(true))
		.child_by_instance(&Selector::new().text("x"), 3)
		.unwrap();

	assert!(!named.exists().unwrap());
	assert!(named.wait_gone(Duration::from_millis(500)).unwrap());
	assert_eq!(fx.agent.calls("exist"), vec![vec![json!("obj-9")]]);
}

#[test]
fn test_scroll_and_fling_parameters() {
	let fx = fixture();
	for method in [
		"scrollForward",
		"scrollToEnd",
		"scrollTo",
		"flingBackward",
		"flingToBeginning",
	] {
		fx.agent.respond_value(method, json!(true));
	}
	let list = fx.device.find(Selector::new().scrollable(true));
	let target = json!({"scrollable": true});

	list.scroll(Axis::Vertical, Scroll::forward()).unwrap();
	list.scroll(Axis::Horizontal, Scroll::ToEnd { steps: 10, max_swipes: 5 }).unwrap();
	list.scroll(Axis::Vertical, Scroll::To(Selector::new().text("About"))).unwrap();
	list.fling(Axis::Horizontal, Fling::Backward).unwrap();
	list.fling(Axis::Vertical, Fling::ToBeginning { max_swipes: 20 }).unwrap();

	assert_eq!(fx.agent.calls("scrollForward"), vec![vec![target.clone(), json!(true), json!(100)]]);
	assert_eq!(
		fx.agent.calls("scrollToEnd"),
		vec![vec![target.clone(), json!(false), json!(5), json!(10)]]
	);
	assert_eq!(
		fx.agent.calls("scrollTo"),
		vec![vec![target.clone(), json!({"text": "About"}), json!(true)]]
	);
	assert_eq!(fx.agent.calls("flingBackward"), vec![vec![target.clone(), json!(false)]]);
	assert_eq!(fx.agent.calls("flingToBeginning"), vec![vec![target, json!(true), json!(20)]]);
}

#[test]
fn test_swipe_and_gestures() {
	let fx = fixture();
	for method in ["swipe", "gesture", "pinchIn", "dragTo"] {
		fx.agent.respond_value(method, json!(true));
	}
	let map = fx.device.find(Selector::new().resource_id("map"));
	let sel = json!({"resourceId": "map"});

	map.swipe(Direction::Left, 20, None).unwrap();
	map.swipe(Direction::Up, 20, Some(0.5)).unwrap();
	map.pinch_in(40, 50).unwrap();
	map.drag_to_point(10, 20, 30).unwrap();
	map.gesture(
		(Point::new(0, 0), Point::new(10, 10)),
		(Point::new(5, 5), Point::new(20, 20)),
		15,
	)
	.unwrap();

	assert_eq!(
		fx.agent.calls("swipe"),
		vec![
			vec![sel.clone(), json!("left"), json!(20)],
			vec![sel.clone(), json!("up"), json!(0.5), json!(20)],
		]
	);
	assert_eq!(fx.agent.calls("pinchIn"), vec![vec![sel.clone(), json!(40), json!(50)]]);
	assert_eq!(fx.agent.calls("dragTo"), vec![vec![sel.clone(), json!(10), json!(20), json!(30)]]);
	assert_eq!(
		fx.agent.calls("gesture"),
		vec![vec![
			sel,
			json!({"x": 0, "y": 0}),
			json!({"x": 10, "y": 10}),
			json!({"x": 5, "y": 5}),
			json!({"x": 20, "y": 20}),
			json!(15)
		]]
	);
}

#[test]
fn test_waits_report_outcome() {
	let fx = fixture();
	fx.agent.respond_value("waitForExists", json!(true));
	fx.agent.respond_value("waitUntilGone", json!(false));

	let spinner = fx.device.find(Selector::new().class_name("android.widget.ProgressBar"));
	assert!(spinner.wait_exists(Duration::from_secs(1)).unwrap());
	assert!(!spinner.wait_gone(Duration::from_millis(250)).unwrap());
	assert_eq!(fx.agent.calls("waitUntilGone")[0][1], json!(250));
}
