use companion_core::error::{ClientError, CoreError};

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;
use std::time::Duration;

/// **VALUE**: Verifies that a startup timeout states the timeout and the last probe result.
///
/// **WHY THIS MATTERS**: "not ready within 10s" alone does not say whether the companion
/// never listened or listened and kept saying no. The last probe is the only clue.
///
/// **BUG THIS CATCHES**: Would catch `last_probe` being dropped from the Display format.
#[test]
fn given_startup_timeout_when_formatted_then_includes_timeout_and_last_probe() {
    // GIVEN: A startup timeout after refused connections
    let err = ClientError::startup_timeout(
        Duration::from_secs(10),
        "unreachable: error sending request",
    );

    // WHEN: Formatting
    let error_string = err.to_string();

    // THEN: Kind, timeout, last probe, and location
    assert!(error_string.starts_with("Startup Timeout Error:"));
    assert!(error_string.contains("10s"));
    assert!(error_string.contains("unreachable: error sending request"));
    assert!(error_string.contains("client.rs"), "{error_string}");
}

#[test]
fn given_server_error_when_inspected_then_exposes_status_code() {
    let err = ClientError::Server {
        status_code: HttpStatusCode(503),
        message: "/executeJs: busy".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    assert_eq!(err.status_code(), Some(HttpStatusCode(503)));
    assert!(!err.is_connect());
    assert!(err.to_string().contains("HTTP 503"));
}

#[test]
fn given_non_server_errors_when_inspected_then_no_status_code() {
    let json_err = ClientError::json("/sign replied with an array");
    let timeout_err = ClientError::startup_timeout(Duration::from_secs(1), "reported not ready");

    assert_eq!(json_err.status_code(), None);
    assert_eq!(timeout_err.status_code(), None);
}

#[test]
fn given_malformed_json_when_converted_then_json_error() {
    // GIVEN: A serde_json parse failure
    let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();

    // WHEN: Converting
    let err = ClientError::from(parse_err);

    // THEN: Json kind
    assert!(matches!(err, ClientError::Json { .. }));
    assert!(err.to_string().starts_with("JSON Error:"));
}

#[test]
fn given_bad_url_when_converted_then_url_parse_error() {
    let parse_err = url::Url::parse("not a url").unwrap_err();

    let err = ClientError::from(parse_err);

    assert!(matches!(err, ClientError::UrlParse { .. }));
    assert!(err.to_string().contains("URL Parse Error"));
}

#[test]
fn given_client_error_when_wrapped_in_core_error_then_displays_transparently() {
    let inner = ClientError::json("/createWallet replied with a string");
    let expected = inner.to_string();

    let err = CoreError::from(inner);

    assert_eq!(err.to_string(), expected);
}
