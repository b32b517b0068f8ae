//! Unit tests for configuration defaults and validation.

use std::str::FromStr;

use rstest::rstest;

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = JsportConfig::default();
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.max_frame_bytes(), DEFAULT_MAX_FRAME_BYTES);
    assert_eq!(config.memory_limit_bytes(), None);
    assert_eq!(config.max_stack_bytes(), None);
    assert_eq!(config.error_detection(), ErrorDetection::Substring);
}

#[test]
fn default_configuration_is_valid() {
    assert_eq!(JsportConfig::default().validate(), Ok(()));
}

#[rstest]
#[case::zero(0)]
#[case::beyond_packet_prefix(0x1_0000_0000)]
fn frame_limit_outside_packet_range_is_rejected(#[case] limit: u64) {
    let config = JsportConfig::default().with_max_frame_bytes(limit);
    let error = config.validate().expect_err("limit should be rejected");
    assert_eq!(error, ConfigError::FrameLimit { value: limit });
    assert!(
        error.to_string().contains(&limit.to_string()),
        "expected rejected value in message: {error}"
    );
}

#[test]
fn largest_packet_length_is_accepted() {
    let config = JsportConfig::default().with_max_frame_bytes(0xFFFF_FFFF);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn builders_replace_fields() {
    let config = JsportConfig::default()
        .with_log_filter("jsport=trace")
        .with_memory_limit_bytes(Some(1024))
        .with_max_stack_bytes(Some(512))
        .with_error_detection(ErrorDetection::Structural);
    assert_eq!(config.log_filter(), "jsport=trace");
    assert_eq!(config.memory_limit_bytes(), Some(1024));
    assert_eq!(config.max_stack_bytes(), Some(512));
    assert_eq!(config.error_detection(), ErrorDetection::Structural);
}

#[rstest]
#[case::substring("substring", ErrorDetection::Substring)]
#[case::structural("structural", ErrorDetection::Structural)]
#[case::mixed_case("Structural", ErrorDetection::Structural)]
fn error_detection_parses_from_text(#[case] text: &str, #[case] expected: ErrorDetection) {
    assert_eq!(ErrorDetection::from_str(text), Ok(expected));
}

#[test]
fn error_detection_rejects_unknown_strategy() {
    assert!(ErrorDetection::from_str("regex").is_err());
}

#[rstest]
#[case::json("json", LogFormat::Json)]
#[case::compact("COMPACT", LogFormat::Compact)]
fn log_format_parses_from_text(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(LogFormat::from_str(text), Ok(expected));
}

#[test]
fn serde_fills_missing_fields_with_defaults() {
    let config: JsportConfig =
        serde_json::from_str(r#"{"error_detection":"structural"}"#).expect("deserialise");
    assert_eq!(config.error_detection(), ErrorDetection::Structural);
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.max_frame_bytes(), DEFAULT_MAX_FRAME_BYTES);
    assert_eq!(config.memory_limit_bytes(), None);
}
