// Local input handling for commands; nothing here talks to a companion

use crate::commands::{
    AUTH_TOKEN_ENV_VAR, CodeSource, auth_token_from, parse_params, resolve_config, settle,
};
use crate::error::CliError;

use companion_core::error::SupervisorError;

use std::path::PathBuf;

use serde_json::json;

#[test]
fn given_inline_code_when_reading_source_then_returns_code() {
    let source = CodeSource::from_args(Some("1 + 1".to_string()), None).unwrap();

    assert_eq!(source.read().unwrap(), "1 + 1");
}

#[test]
fn given_code_file_when_reading_source_then_returns_contents() {
    // GIVEN: A script on disk
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.js");
    std::fs::write(&path, "console.log('hi')").unwrap();

    // WHEN
    let source = CodeSource::from_args(None, Some(path.clone())).unwrap();

    // THEN
    assert_eq!(source, CodeSource::File(path));
    assert_eq!(source.read().unwrap(), "console.log('hi')");
}

#[test]
fn given_missing_code_file_when_reading_source_then_error_names_path() {
    let source = CodeSource::File(PathBuf::from("/nonexistent/script.js"));

    let err = source.read().unwrap_err();

    assert!(err.to_string().contains("/nonexistent/script.js"));
}

#[test]
fn given_both_sources_when_building_then_error() {
    let result = CodeSource::from_args(Some("1".to_string()), Some(PathBuf::from("a.js")));

    assert!(result.is_err());
}

#[test]
fn given_object_params_when_parsing_then_returns_value() {
    let params = parse_params(Some(r#"{"publicKey":"0x04","n":2}"#)).unwrap();

    assert_eq!(params, Some(json!({ "publicKey": "0x04", "n": 2 })));
}

#[test]
fn given_no_params_when_parsing_then_none() {
    assert_eq!(parse_params(None).unwrap(), None);
}

/// **VALUE**: Verifies that `--params` must be a JSON object.
///
/// **WHY THIS MATTERS**: The companion spreads `jsParams` into the script's globals;
/// an array or scalar reaches it as garbage and fails far from the typo.
#[test]
fn given_non_object_or_invalid_params_when_parsing_then_error() {
    assert!(parse_params(Some("[1,2]")).is_err());
    assert!(parse_params(Some("42")).is_err());
    assert!(parse_params(Some("{oops")).is_err());
}

#[test]
fn given_token_in_environment_when_reading_then_returns_secret() {
    let token = auth_token_from(|key| (key == AUTH_TOKEN_ENV_VAR).then(|| "s3cr3t".to_string()))
        .unwrap();

    assert_eq!(token.as_str(), "s3cr3t");
}

#[test]
fn given_blank_or_missing_token_when_reading_then_error() {
    let missing = auth_token_from(|_| None);
    let blank = auth_token_from(|_| Some("   ".to_string()));

    assert!(missing.unwrap_err().to_string().contains(AUTH_TOKEN_ENV_VAR));
    assert!(blank.is_err());
}

/// **VALUE**: Verifies that `--port` wins over the config file.
///
/// **BUG THIS CATCHES**: Would catch the flag being applied before the file is loaded
/// and then overwritten by it.
#[test]
fn given_config_file_and_port_flag_when_resolving_then_flag_wins() {
    // GIVEN: A config file with one port
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companion.json");
    std::fs::write(&path, r#"{"port": 4100, "entry_point": "server.mjs"}"#).unwrap();

    // WHEN: Resolving with a different --port
    let config = resolve_config(Some(&path), Some(4200)).unwrap();

    // THEN: Flag value, other file values kept
    assert_eq!(config.port, 4200);
    assert_eq!(config.entry_point, "server.mjs");
}

#[test]
fn given_zero_port_flag_when_resolving_then_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let result = resolve_config(Some(&path), Some(0));

    assert!(result.is_err());
}

/// **VALUE**: Verifies that a failed teardown does not mask the failed call.
///
/// **WHY THIS MATTERS**: The call's error says what the user asked for went wrong. Replacing
/// it with a stop error would report a shutdown problem and hide the real failure.
///
/// **BUG THIS CATCHES**: Would catch `close()?` running ahead of returning the call's result.
#[test]
fn given_call_and_close_both_failing_when_settled_then_call_error_returned() {
    // GIVEN: A failed call and a failed teardown
    let outcome = Err(CliError::cli("/sign failed"));
    let closed = Err(SupervisorError::installation("stop failed"));

    // WHEN: Settling
    let result = settle(outcome, closed);

    // THEN: The call's error
    let err = result.unwrap_err();
    assert!(err.to_string().contains("/sign failed"), "{err}");
}

#[test]
fn given_successful_call_and_failed_close_when_settled_then_close_error_returned() {
    let result = settle(
        Ok(json!({ "success": true })),
        Err(SupervisorError::installation("stop failed")),
    );

    let err = result.unwrap_err();
    assert!(matches!(err, CliError::Core { .. }));
    assert!(err.to_string().contains("stop failed"));
}

#[test]
fn given_clean_close_when_settled_then_call_result_returned() {
    let result = settle(Ok(json!({ "success": true })), Ok(()));

    assert_eq!(result.unwrap(), json!({ "success": true }));
}
