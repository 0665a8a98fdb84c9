use crate::{ModelError, ServerInfoBuilder};

fn complete_builder() -> ServerInfoBuilder {
    ServerInfoBuilder::default()
        .with_pid(12345)
        .with_port(3092)
        .with_base_url("http://localhost:3092")
        .with_command("node bundled_server.js")
}

fn validation_message(result: Result<crate::ServerInfo, ModelError>) -> String {
    match result.expect_err("builder should reject input") {
        ModelError::Validation { message, .. } => message,
    }
}

/// **VALUE**: Verifies that a fully populated builder produces the expected snapshot.
///
/// **BUG THIS CATCHES**: Would catch a field being dropped or swapped during construction,
/// which would make `CompanionServer::server_info()` report the wrong PID or port.
#[test]
fn given_all_fields_when_building_then_returns_server_info() {
    // GIVEN: A complete builder
    // WHEN: Building
    let info = complete_builder().build().expect("complete builder should succeed");

    // THEN: Every field is carried through
    assert_eq!(info.pid, 12345);
    assert_eq!(info.port, 3092);
    assert_eq!(info.base_url, "http://localhost:3092");
    assert_eq!(info.command, "node bundled_server.js");
}

/// **VALUE**: Verifies that PID 0 is rejected.
///
/// **WHY THIS MATTERS**: PID 0 never names a child we spawned. Accepting it would let the
/// supervisor report a process it cannot signal or reap.
#[test]
fn given_zero_pid_when_building_server_info_then_returns_validation_error() {
    // GIVEN: Builder with PID set to zero
    let builder = complete_builder().with_pid(0);

    // WHEN: Attempting to build
    let message = validation_message(builder.build());

    // THEN: Should return validation error
    assert_eq!(message, "PID must be non-zero");
}

#[test]
fn given_missing_pid_when_building_then_returns_validation_error() {
    // GIVEN: Builder without PID
    let builder = ServerInfoBuilder::default()
        .with_port(3092)
        .with_base_url("http://localhost:3092")
        .with_command("node bundled_server.js");

    // WHEN / THEN
    assert_eq!(validation_message(builder.build()), "PID is required");
}

/// **VALUE**: Verifies that non-HTTP base URLs are rejected.
///
/// **BUG THIS CATCHES**: Would catch removal of the scheme check, letting a snapshot advertise
/// a URL the RPC client can never reach.
#[test]
fn given_invalid_url_scheme_when_building_then_returns_validation_error() {
    // GIVEN: Builder with non-http/https URL
    let builder = complete_builder().with_base_url("ftp://localhost:3092");

    // WHEN: Attempting to build
    let message = validation_message(builder.build());

    // THEN: Should mention the bad URL
    assert!(message.starts_with("Invalid base URL format:"));
    assert!(message.contains("ftp://"));
}

#[test]
fn given_blank_command_when_building_then_returns_validation_error() {
    let builder = complete_builder().with_command("   ");

    assert_eq!(validation_message(builder.build()), "Command cannot be empty");
}
