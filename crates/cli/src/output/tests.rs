use serde_json::json;

use super::*;

#[test]
fn result_builder_success() {
	let result = ResultBuilder::new("count").serial(Some("emulator-5554".into())).data(json!(3)).build();

	assert!(result.ok);
	assert_eq!(result.command, "count");
	assert_eq!(result.schema_version, Some(SCHEMA_VERSION));
	assert!(result.error.is_none());
	assert!(result.timings.is_some());
}

#[test]
fn result_builder_error() {
	let result: CommandResult<Value> = ResultBuilder::new("click")
		.error(CommandError {
			code: ErrorCode::ElementNotFound,
			message: "no match".into(),
			details: None,
		})
		.build();

	assert!(!result.ok);
	assert!(result.data.is_none());
	assert_eq!(result.error.as_ref().unwrap().code, ErrorCode::ElementNotFound);
}

#[test]
fn error_code_display_matches_serde() {
	for code in [ErrorCode::ElementNotFound, ErrorCode::InvalidInput, ErrorCode::VersionMismatch] {
		assert_eq!(serde_json::to_value(code).unwrap(), json!(code.to_string()));
	}
	assert_eq!(ErrorCode::DeviceNotFound.to_string(), "DEVICE_NOT_FOUND");
}

#[test]
fn output_format_parse() {
	assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
	assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
	assert!("toon".parse::<OutputFormat>().is_err());
}

#[test]
fn serialize_envelope_in_camel_case() {
	let result = ResultBuilder::new("screenshot").data(json!({"path": "/tmp/a.png"})).build();
	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["ok"], json!(true));
	assert_eq!(json["schemaVersion"], json!(1));
	assert!(json["timings"]["durationMs"].is_u64());
	assert!(json.get("serial").is_none());
}

#[test]
fn render_text_shapes() {
	assert_eq!(render_text(&json!("pong")), "pong\n");
	assert_eq!(render_text(&json!(true)), "true\n");
	assert_eq!(render_text(&json!(null)), "");
	assert_eq!(render_text(&json!(["a", "b"])), "a\nb\n");
	assert_eq!(render_text(&json!("<a/>\n")), "<a/>\n");
	assert_eq!(render_text(&json!({"product": "x", "sdk": 29})), "product  x\nsdk      29\n");
}
