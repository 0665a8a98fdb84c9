use companion_core::error::{CoreError, SupervisorError};

use models::ServerInfoBuilder;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;

/// **VALUE**: Verifies that `SupervisorError::Installation` carries kind, message and location.
///
/// **WHY THIS MATTERS**: Installation problems are reported to end users, who paste the
/// message into bug reports. The location tells us which check fired.
///
/// **BUG THIS CATCHES**: Would catch if someone:
/// - Removes `#[track_caller]` from `SupervisorError::installation`
/// - Breaks the Display implementation to drop the location
#[test]
fn given_installation_error_when_formatted_then_includes_kind_message_and_location() {
    // GIVEN: An installation error built through the helper
    let err = SupervisorError::installation("Companion entry point not found");

    // WHEN: Formatting
    let error_string = err.to_string();

    // THEN: Kind, message, and this file
    assert!(error_string.starts_with("Installation Error:"));
    assert!(error_string.contains("Companion entry point not found"));
    assert!(error_string.contains("supervisor.rs"), "{error_string}");
}

#[test]
fn given_log_sink_error_when_inspected_then_exposes_io_source() {
    let err = SupervisorError::log_sink(
        "Failed to open log file /var/companion/server.log",
        IoError::new(ErrorKind::PermissionDenied, "permission denied"),
    );

    let source = err.source().expect("LogSink keeps its io::Error");

    assert!(err.to_string().contains("Log Sink Error"));
    assert_eq!(source.to_string(), "permission denied");
}

/// **VALUE**: Verifies that a spawn failure keeps the OS error in its source chain.
///
/// **BUG THIS CATCHES**: Would catch the `#[source]` attribute being dropped, which loses
/// errno details like "Exec format error" that explain why a launch failed.
#[test]
fn given_spawn_error_when_inspected_then_source_chain_preserved() {
    // GIVEN: A spawn error wrapping an io::Error
    let err = SupervisorError::Spawn {
        message: "Failed to spawn `node bundled_server.js`".to_string(),
        location: common::ErrorLocation::from(std::panic::Location::caller()),
        source: Box::new(IoError::other("Exec format error")),
    };

    // WHEN: Walking the source chain
    let source = err.source();

    // THEN: The OS error is reachable
    assert!(err.to_string().contains("Spawn Error"));
    assert_eq!(source.map(ToString::to_string).as_deref(), Some("Exec format error"));
}

#[test]
fn given_shutdown_error_when_formatted_then_includes_kind() {
    let err = SupervisorError::shutdown(
        "Failed to wait for companion (PID: 42)",
        IoError::new(ErrorKind::Interrupted, "interrupted"),
    );

    let error_string = err.to_string();

    assert!(error_string.contains("Shutdown Error"));
    assert!(error_string.contains("PID: 42"));
}

#[test]
fn given_invalid_server_info_when_converted_then_validation_error() {
    // GIVEN: A model validation failure
    let model_err = ServerInfoBuilder::default()
        .with_port(3092)
        .build()
        .unwrap_err();

    // WHEN: Converting into a supervisor error
    let err = SupervisorError::from(model_err);

    // THEN: Validation kind with the model's message
    assert!(matches!(err, SupervisorError::Validation { .. }));
    assert!(err.to_string().contains("PID is required"), "{err}");
}

#[test]
fn given_supervisor_error_when_wrapped_in_core_error_then_displays_transparently() {
    let inner = SupervisorError::installation("launcher `node` not found");
    let expected = inner.to_string();

    let err = CoreError::from(inner);

    assert_eq!(err.to_string(), expected);
}
