//! Configuration loading from TOML files and environment lookups.

use asesor::config::PipelineConfig;
use asesor::{Pipeline, VideoFailurePolicy};

#[test]
fn full_toml_config_builds_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asesor.toml");
    std::fs::write(
        &path,
        r#"
[text]
api_key = "sk-file"
model = "gpt-4o-mini"
max_tokens = 300
timeout_secs = 20

[text.retry]
max_attempts = 3
initial_backoff_ms = 250

[speech]
enabled = true
api_key = "xi-file"
voice_id = "21m00Tcm4TlvDq8ikWAM"

[video]
enabled = true
api_key = "hg-file"
avatar_id = "Daisy-inskirt-20220818"
voice_id = "es-AR-voice"
max_wait_secs = 120
poll_interval_secs = 10
on_failure = "degrade"
"#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(config.text.max_tokens, Some(300));
    assert_eq!(config.text.retry.max_attempts, 3);
    assert_eq!(config.text.retry.backoff_multiplier, 2.0);
    assert_eq!(config.video.voice_id.as_deref(), Some("es-AR-voice"));
    assert_eq!(config.video.on_failure, VideoFailurePolicy::Degrade);

    let pipeline = Pipeline::from_config(config).unwrap();
    let debug = format!("{pipeline:?}");
    assert!(!debug.contains("sk-file"));
    assert!(!debug.contains("xi-file"));
}

#[test]
fn invalid_values_are_rejected_at_build_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asesor.toml");
    std::fs::write(
        &path,
        r#"
[video]
enabled = true
api_key = "hg-file"
avatar_id = "avatar"
max_wait_secs = 5
poll_interval_secs = 30
"#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    let err = Pipeline::from_config(config).unwrap_err();
    assert_eq!(err.code(), "CONFIG_INVALID");
    assert!(err.to_string().contains("poll_interval"));
}

#[test]
fn lookup_without_keys_leaves_enrichment_off() {
    let config = PipelineConfig::from_lookup(|name| match name {
        "TEXT_API_KEY" => Some("sk-env".to_owned()),
        "VIDEO_AVATAR_ID" => Some("avatar".to_owned()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.text.api_key.as_str(), "sk-env");
    assert!(!config.speech.enabled);
    assert!(!config.video.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn oversized_wait_budget_from_env_is_rejected() {
    let config = PipelineConfig::from_lookup(|name| match name {
        "TEXT_API_KEY" => Some("sk-env".to_owned()),
        "VIDEO_API_KEY" => Some("hg-env".to_owned()),
        "VIDEO_AVATAR_ID" => Some("avatar".to_owned()),
        "VIDEO_MAX_WAIT_SECONDS" => Some(u64::MAX.to_string()),
        _ => None,
    })
    .unwrap();

    assert!(config.video.enabled);
    let err = Pipeline::from_config(config).unwrap_err();
    assert_eq!(err.code(), "CONFIG_INVALID");
    assert!(err.to_string().contains("max_wait_secs"));
}
