use crate::config::{ConfigError, DisplayConfig};

#[test]
fn empty_object_is_default() {
    let config = DisplayConfig::parse("{}").unwrap();
    assert_eq!(config, DisplayConfig::default());
    assert_eq!(config.vsyncs_to_apply_rate_change, 1);
    assert_eq!(config.max_layer_count, 32);
    assert_eq!(config.cwb_wait_ms, 1000);
}

#[test]
fn kebab_case_fields() {
    let config = DisplayConfig::parse(
        r#"{ "disable-hdr-handling": true, "cwb-wait-ms": 20, "max-layer-count": 4 }"#,
    )
    .unwrap();
    assert!(config.disable_hdr_handling);
    assert_eq!(config.cwb_wait_ms, 20);
    assert_eq!(config.max_layer_count, 4);
    assert!(!config.swap_interval_zero);
}

#[test]
fn rejects_invalid() {
    assert!(matches!(
        DisplayConfig::parse(r#"{ "unknown-field": 1 }"#),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        DisplayConfig::parse(r#"{ "vsyncs-to-apply-rate-change": 0 }"#),
        Err(ConfigError::ZeroVsyncs)
    ));
}

#[test]
fn json_round_trip() {
    let mut config = DisplayConfig::default();
    config.enable_gpu_tonemapper = true;
    let json = config.to_json().unwrap();
    assert!(json.contains("enable-gpu-tonemapper"));
    assert_eq!(DisplayConfig::parse(&json).unwrap(), config);
}
