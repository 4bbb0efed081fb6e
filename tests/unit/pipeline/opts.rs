use super::*;

#[test]
fn defaults_are_valid() {
    let o = ConvertOpts::default();
    o.validate().unwrap();
    assert_eq!(o.backing_scale, 2.0);
    assert_eq!(o.effective_pool_buffers(), o.max_in_flight + 2);
    assert_eq!(
        o.append_policy,
        AppendPolicy::Retry {
            max_retries: 8,
            backoff_ms: 2
        }
    );
}

#[test]
fn invalid_values_are_rejected() {
    let mut o = ConvertOpts::default();
    o.backing_scale = 0.0;
    assert!(o.validate().is_err());
    let mut o = ConvertOpts::default();
    o.backing_scale = f64::NAN;
    assert!(o.validate().is_err());
    let mut o = ConvertOpts::default();
    o.max_in_flight = 0;
    assert!(o.validate().is_err());
    let mut o = ConvertOpts::default();
    o.inspect.spatial_identifier = "  ".to_string();
    assert!(o.validate().is_err());
}

#[test]
fn partial_json_fills_defaults() {
    let o: ConvertOpts = serde_json::from_str(
        r#"{ "codec": "hevc", "append_policy": { "kind": "abort" }, "backing_scale": 1.0 }"#,
    )
    .unwrap();
    assert_eq!(o.codec, OutputCodec::Hevc);
    assert_eq!(o.append_policy, AppendPolicy::Abort);
    assert_eq!(o.backing_scale, 1.0);
    assert_eq!(o.session_start, DEFAULT_SESSION_START);
}

#[test]
fn policy_parse_accepts_cli_spellings() {
    assert_eq!(AppendPolicy::parse("drop").unwrap(), AppendPolicy::Drop);
    assert_eq!(AppendPolicy::parse("Abort").unwrap(), AppendPolicy::Abort);
    assert_eq!(AppendPolicy::parse("retry").unwrap(), AppendPolicy::default());
    assert!(AppendPolicy::parse("sometimes").is_err());
}
