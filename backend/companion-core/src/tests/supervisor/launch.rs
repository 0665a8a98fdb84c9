// Unit tests for launch helpers.
// Process lifecycle is covered in integration_tests/supervisor/.

use crate::COMPANION_PORT_ENV_VAR;
use crate::config::CompanionConfig;
use crate::error::supervisor::SupervisorError;
use crate::supervisor::launch::{
    build_launch_command, describe_command, locate_entry_point, open_log_sink, resolve_server_dir,
};

use std::ffi::OsStr;
use std::path::Path;

fn config_with_args() -> CompanionConfig {
    CompanionConfig {
        port: 4321,
        program: "node".to_string(),
        entry_point: "bundled_server.js".to_string(),
        extra_args: vec!["--inspect".to_string()],
        ..Default::default()
    }
}

/// **VALUE**: Verifies the launch command carries program, args, `PORT`, and working directory.
///
/// **WHY THIS MATTERS**: The companion takes its listening port only from `PORT` and resolves
/// its own files relative to its working directory. Losing either means it listens somewhere
/// the client never probes, and every start ends in a startup timeout.
///
/// **BUG THIS CATCHES**: Would catch the env var being renamed, the port being passed as an
/// argument instead, or `current_dir` being dropped.
#[test]
fn given_config_when_build_launch_command_called_then_injects_port_and_working_dir() {
    // GIVEN: A config with extra args and a server dir
    let config = config_with_args();
    let server_dir = Path::new("/srv/companion");

    // WHEN: Building the command
    let cmd = build_launch_command(&config, server_dir);

    // THEN: Program, args, PORT and cwd are all set
    assert_eq!(cmd.get_program(), "node");
    let args: Vec<&OsStr> = cmd.get_args().collect();
    assert_eq!(args, vec!["bundled_server.js", "--inspect"]);
    let port = cmd
        .get_envs()
        .find(|(key, _)| *key == COMPANION_PORT_ENV_VAR)
        .and_then(|(_, value)| value);
    assert_eq!(port, Some(OsStr::new("4321")));
    assert_eq!(cmd.get_current_dir(), Some(server_dir));
}

#[test]
fn given_config_when_describe_command_called_then_joins_program_and_args() {
    assert_eq!(
        describe_command(&config_with_args()),
        "node bundled_server.js --inspect"
    );
}

/// **VALUE**: Verifies that a missing bundle is an installation error, not a launch attempt.
///
/// **BUG THIS CATCHES**: Would catch the existence check being removed, which would spawn
/// `node` against a missing script and only fail later as an opaque startup timeout.
#[test]
fn given_missing_entry_point_when_located_then_returns_installation_error() {
    // GIVEN: An empty server directory
    let dir = tempfile::tempdir().unwrap();

    // WHEN: Locating the entry point
    let result = locate_entry_point(dir.path(), "bundled_server.js");

    // THEN: Installation error mentioning the path
    match result {
        Err(SupervisorError::Installation { message, .. }) => {
            assert!(message.contains("bundled_server.js"));
            assert!(message.contains("installation issue"));
        }
        other => panic!("Expected Installation error, got {other:?}"),
    }
}

#[test]
fn given_missing_absolute_server_dir_when_resolved_then_returns_installation_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("not-here");

    let result = resolve_server_dir(&missing);

    assert!(matches!(result, Err(SupervisorError::Installation { .. })));
}

#[test]
fn given_existing_absolute_server_dir_when_resolved_then_returns_it_unchanged() {
    let dir = tempfile::tempdir().unwrap();

    let resolved = resolve_server_dir(dir.path()).unwrap();

    assert_eq!(resolved, dir.path());
}

/// **VALUE**: Verifies that the log sink appends rather than truncates.
///
/// **WHY THIS MATTERS**: A restarted companion would otherwise wipe the output of the run
/// that just failed, which is exactly the output needed to diagnose it.
#[test]
fn given_existing_log_when_sink_reopened_then_appends() {
    use std::io::Write;

    // GIVEN: A log file with earlier output
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("server.log"), "first run\n").unwrap();

    // WHEN: Opening the sink and writing to it
    let (mut file, path) = open_log_sink(dir.path(), Path::new("server.log")).unwrap();
    writeln!(file, "second run").unwrap();
    drop(file);

    // THEN: Both runs are present
    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents, "first run\nsecond run\n");
}
