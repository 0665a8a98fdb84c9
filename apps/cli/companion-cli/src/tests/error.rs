// Unit tests for error module
// Tests conversion from core errors and location tracking

use crate::error::CliError;

use companion_core::error::{ClientError, ConfigError, SupervisorError};

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

/// **VALUE**: Verifies that a core error keeps its own text inside the CLI error.
///
/// **WHY THIS MATTERS**: The user sees only the CLI error. If the core kind and location
/// were dropped, "Startup Timeout" and "Installation" failures would look identical.
///
/// **BUG THIS CATCHES**: Would catch the From impls formatting only a generic message.
#[test]
fn given_client_error_when_converted_then_core_message_preserved() {
    // GIVEN: A startup timeout from the client
    let core = ClientError::startup_timeout(Duration::from_secs(10), "reported not ready");
    let core_text = core.to_string();

    // WHEN: Converting
    let err = CliError::from(core);

    // THEN: Core variant carrying the full core message
    match &err {
        CliError::Core { message, .. } => assert_eq!(message, &core_text),
        other => panic!("Expected Core variant, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Core Error: Startup Timeout Error:"));
}

#[test]
fn given_supervisor_error_when_converted_then_core_variant() {
    let err = CliError::from(SupervisorError::installation("launcher `node` not found"));

    assert!(matches!(err, CliError::Core { .. }));
    assert!(err.to_string().contains("launcher `node` not found"));
}

#[test]
fn given_config_error_when_converted_then_core_variant() {
    let config_err = ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: "port must be non-zero".to_string(),
    };

    let err = CliError::from(config_err);

    assert!(err.to_string().contains("port must be non-zero"));
}

#[test]
fn given_cli_error_when_formatted_then_includes_location() {
    let err = CliError::cli("--params must be a JSON object");

    let error_string = err.to_string();

    assert!(error_string.starts_with("CLI Error:"));
    assert!(error_string.contains("error.rs"), "{error_string}");
}
