use crate::DEFAULT_COMPANION_PORT;
use crate::config::{CompanionConfig, ENV_PORT, ENV_PROGRAM, ENV_READY_TIMEOUT_SECS, ENV_SERVER_DIR};
use crate::error::config::ConfigError;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

/// **VALUE**: Pins the defaults the companion bundle expects.
///
/// **WHY THIS MATTERS**: The bundled companion listens on whatever `PORT` says, but callers
/// who never configure anything rely on 3092 / 10s / 100ms matching the SDKs it ships with.
#[test]
fn given_no_config_when_defaulted_then_matches_companion_conventions() {
    // GIVEN / WHEN: The default config
    let config = CompanionConfig::default();

    // THEN: Port, timing, and launch defaults line up
    assert_eq!(config.port, DEFAULT_COMPANION_PORT);
    assert_eq!(config.base_url(), "http://localhost:3092");
    assert_eq!(config.ready_timeout(), Duration::from_secs(10));
    assert_eq!(config.poll_interval(), Duration::from_millis(100));
    assert_eq!(config.program, "node");
    assert_eq!(config.entry_point, "bundled_server.js");
    assert_eq!(config.request_timeout(), None);
    assert!(config.reuse_running);
    assert!(config.validate().is_ok());
}

#[test]
fn given_partial_json_when_deserialized_then_missing_fields_take_defaults() {
    // GIVEN: JSON naming only the port
    let json = r#"{ "port": 4100 }"#;

    // WHEN: Deserializing
    let config: CompanionConfig = serde_json::from_str(json).unwrap();

    // THEN: Everything else is defaulted
    assert_eq!(config.port, 4100);
    assert_eq!(config.log_file, PathBuf::from("server.log"));
    assert_eq!(config.shutdown_grace_secs, 5);
}

/// **VALUE**: Verifies that a poll interval longer than the readiness window is rejected.
///
/// **BUG THIS CATCHES**: Would catch the bounds check being dropped, which would let
/// `wait_until_ready` sleep past its own deadline before the first retry.
#[test]
fn given_poll_interval_beyond_timeout_when_validated_then_returns_validation_error() {
    // GIVEN: 1s timeout with a 2s poll interval
    let config = CompanionConfig {
        ready_timeout_secs: 1,
        poll_interval_ms: 2_000,
        ..Default::default()
    };

    // WHEN: Validating
    let result = config.validate();

    // THEN: Rejected with a reason naming the field
    match result {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains("poll_interval_ms"), "reason was {reason}");
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn given_zero_port_when_validated_then_returns_validation_error() {
    let config = CompanionConfig {
        port: 0,
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
fn given_overrides_when_applied_then_replace_defaults() {
    // GIVEN: All supported overrides
    let lookup = lookup_from(&[
        (ENV_PORT, "4200"),
        (ENV_SERVER_DIR, "/opt/companion"),
        (ENV_PROGRAM, "bun"),
        (ENV_READY_TIMEOUT_SECS, " 30 "),
    ]);
    let mut config = CompanionConfig::default();

    // WHEN: Applying them
    config.apply_overrides(lookup).unwrap();

    // THEN: Each field reflects its override
    assert_eq!(config.port, 4200);
    assert_eq!(config.server_dir, PathBuf::from("/opt/companion"));
    assert_eq!(config.program, "bun");
    assert_eq!(config.ready_timeout_secs, 30);
}

/// **VALUE**: Verifies that garbage in an override is an error instead of being ignored.
///
/// **BUG THIS CATCHES**: Would catch a silent fallback to the default port, which would
/// start a second companion on 3092 while the user expected a different one.
#[test]
fn given_unparsable_port_override_when_applied_then_returns_validation_error() {
    let mut config = CompanionConfig::default();

    let result = config.apply_overrides(lookup_from(&[(ENV_PORT, "not-a-port")]));

    match result {
        Err(ConfigError::ValidationError { reason, .. }) => {
            assert!(reason.contains(ENV_PORT));
        }
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn given_missing_file_when_loaded_then_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = CompanionConfig::load(&dir.path().join("absent.json")).unwrap();

    assert_eq!(config, CompanionConfig::default());
}

#[test]
fn given_corrupt_file_when_loaded_then_returns_parse_error() {
    // GIVEN: A file that is not JSON
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companion.json");
    std::fs::write(&path, "{ port: ").unwrap();

    // WHEN: Loading
    let result = CompanionConfig::load(&path);

    // THEN: ParseError naming the file
    match result {
        Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected ParseError, got {other:?}"),
    }
}
