// Lifecycle tests against a real child process.
// The companion is a throwaway `sh` script, so these run on Unix only.
#![cfg(unix)]

use crate::helpers::{SCRIPT_NAME, script_companion, wait_for_file_containing};

use companion_core::CompanionServer;
use companion_core::error::SupervisorError;
use companion_core::supervisor::process::is_alive;
use companion_core::supervisor::shutdown::{
    GracefulShutdown, InterruptSignal, ShutdownRequest,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const SLEEPER: &str = "exec sleep 30\n";
const LOG_WAIT: Duration = Duration::from_secs(5);

// ----------------------------------------------------------------------------
// start()
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies that `start()` on a running handle keeps the existing process.
///
/// **WHY THIS MATTERS**: A second spawn would either fail to bind the port or, worse,
/// leave the first child orphaned with nothing left holding its handle.
///
/// **BUG THIS CATCHES**: Would catch the idempotency guard being removed from `start()`.
#[test]
fn given_started_server_when_started_again_then_pid_unchanged() {
    // GIVEN: A started companion
    let dir = tempfile::tempdir().unwrap();
    let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER));
    server.start().unwrap();
    let first_pid = server.pid().expect("running server has a pid");

    // WHEN: Starting again
    server.start().unwrap();

    // THEN: Same process
    assert_eq!(server.pid(), Some(first_pid));
    assert!(is_alive(first_pid));

    server.stop().unwrap();
}

/// **VALUE**: Verifies that the companion sees its port in `PORT` and writes to the log sink.
///
/// **BUG THIS CATCHES**: Would catch the env injection or the stdout redirect being lost.
/// Either regression is invisible until the companion listens on its own default port.
#[test]
fn given_server_when_started_then_port_injected_and_output_logged() {
    // GIVEN: A companion that prints its PORT
    let dir = tempfile::tempdir().unwrap();
    let config = script_companion(dir.path(), "echo \"port=$PORT\"\necho oops >&2\nexec sleep 30\n");
    let expected = format!("port={}", config.port);
    let mut server = CompanionServer::new(config);

    // WHEN: Starting it
    server.start().unwrap();
    let log_path = server.log_path().expect("log path while running").to_path_buf();

    // THEN: Both streams land in server.log inside the server dir
    assert_eq!(log_path, dir.path().join("server.log"));
    let contents = wait_for_file_containing(&log_path, "oops", LOG_WAIT);
    assert!(contents.contains(&expected), "log was: {contents}");
    assert!(contents.contains("oops"), "stderr should be logged too: {contents}");

    server.stop().unwrap();
}

#[test]
fn given_started_server_when_server_info_read_then_describes_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = script_companion(dir.path(), SLEEPER);
    let port = config.port;
    let mut server = CompanionServer::new(config);

    server.start().unwrap();
    let info = server.server_info().expect("info while running").clone();

    assert_eq!(Some(info.pid), server.pid());
    assert_eq!(info.port, port);
    assert_eq!(info.base_url, format!("http://localhost:{port}"));
    assert_eq!(info.command, format!("sh {SCRIPT_NAME}"));

    server.stop().unwrap();
}

/// **VALUE**: Verifies that a missing bundle fails at `start()` with an installation error.
///
/// **WHY THIS MATTERS**: Launching nothing and then waiting ten seconds for readiness would
/// bury the real cause under a startup timeout.
#[test]
fn given_missing_entry_point_when_started_then_returns_installation_error() {
    // GIVEN: A config whose script was never written
    let dir = tempfile::tempdir().unwrap();
    let mut config = script_companion(dir.path(), SLEEPER);
    config.entry_point = "missing.sh".to_string();
    let mut server = CompanionServer::new(config);

    // WHEN: Starting
    let result = server.start();

    // THEN: Installation error, nothing running
    assert!(
        matches!(result, Err(SupervisorError::Installation { .. })),
        "got {result:?}"
    );
    assert!(!server.is_running());
}

#[test]
fn given_missing_program_when_started_then_returns_installation_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = script_companion(dir.path(), SLEEPER);
    config.program = "companion-launcher-that-does-not-exist".to_string();
    let mut server = CompanionServer::new(config);

    let result = server.start();

    match result {
        Err(SupervisorError::Installation { message, .. }) => {
            assert!(message.contains("companion-launcher-that-does-not-exist"));
        }
        other => panic!("Expected Installation error, got {other:?}"),
    }
}

// ----------------------------------------------------------------------------
// stop()
// ----------------------------------------------------------------------------

#[test]
fn given_unstarted_server_when_stopped_then_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER));

    assert!(server.stop().is_ok());
    assert!(server.stop().is_ok());
    assert!(!server.is_running());
}

/// **VALUE**: Verifies that after `stop()` returns the process is gone from the process table.
///
/// **WHY THIS MATTERS**: `stop()` promises the child is reaped, so a following `start()`
/// cannot race a still-exiting companion for the port and no zombie is left behind.
///
/// **BUG THIS CATCHES**: Would catch the `wait()` being skipped after the signal.
#[test]
fn given_running_server_when_stopped_then_process_reaped() {
    // GIVEN: A running companion
    let dir = tempfile::tempdir().unwrap();
    let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER));
    server.start().unwrap();
    let pid = server.pid().unwrap();
    assert!(is_alive(pid));

    // WHEN: Stopping
    server.stop().unwrap();

    // THEN: Handle cleared and process gone
    assert!(!server.is_running());
    assert_eq!(server.pid(), None);
    assert!(!is_alive(pid), "PID {pid} should not be in the process table");
}

/// **VALUE**: Verifies that the graceful signal reaches the companion before any kill.
///
/// **WHY THIS MATTERS**: The companion persists session state on shutdown. A straight
/// SIGKILL would skip that and corrupt the next start.
#[test]
fn given_companion_handling_term_when_stopped_then_exits_gracefully() {
    // GIVEN: A companion that logs when it receives SIGTERM
    let dir = tempfile::tempdir().unwrap();
    let script = "trap 'echo terminated-gracefully; exit 0' TERM\necho armed\nwhile true; do sleep 0.05; done\n";
    let mut server = CompanionServer::new(script_companion(dir.path(), script));
    server.start().unwrap();
    let log_path = server.log_path().unwrap().to_path_buf();
    wait_for_file_containing(&log_path, "armed", LOG_WAIT);

    // WHEN: Stopping
    server.stop().unwrap();

    // THEN: The trap ran
    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("terminated-gracefully"), "log was: {contents}");
}

/// **VALUE**: Verifies that a companion ignoring SIGTERM is still killed once the grace ends.
///
/// **BUG THIS CATCHES**: Would catch `stop()` waiting forever on a wedged companion,
/// which would hang every test run and every process exit that drops a client.
#[test]
fn given_companion_ignoring_term_when_stopped_then_force_killed_after_grace() {
    // GIVEN: A companion that ignores SIGTERM, with a 1s grace
    let dir = tempfile::tempdir().unwrap();
    let script = "trap '' TERM\necho armed\nwhile true; do sleep 0.05; done\n";
    let mut config = script_companion(dir.path(), script);
    config.shutdown_grace_secs = 1;
    let mut server = CompanionServer::new(config);
    server.start().unwrap();
    let pid = server.pid().unwrap();
    wait_for_file_containing(&server.log_path().unwrap().to_path_buf(), "armed", LOG_WAIT);

    // WHEN: Stopping
    let started = Instant::now();
    server.stop().unwrap();

    // THEN: Returned after roughly the grace period with the process gone
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!is_alive(pid));
}

/// Answers every shutdown request the same way and counts the calls.
struct FixedAnswerShutdown {
    answer: ShutdownRequest,
    calls: Arc<AtomicUsize>,
}

impl FixedAnswerShutdown {
    fn boxed(answer: ShutdownRequest, calls: &Arc<AtomicUsize>) -> Box<dyn GracefulShutdown> {
        Box::new(Self {
            answer,
            calls: Arc::clone(calls),
        })
    }
}

impl GracefulShutdown for FixedAnswerShutdown {
    fn request_shutdown(&self, _pid: u32) -> ShutdownRequest {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }

    fn name(&self) -> &'static str {
        "fixed-answer"
    }
}

#[test]
fn given_strategy_without_graceful_signal_when_stopped_then_kills_immediately() {
    // GIVEN: A server whose shutdown strategy cannot signal
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER))
        .with_shutdown(FixedAnswerShutdown::boxed(ShutdownRequest::Unsupported, &calls));
    server.start().unwrap();
    let pid = server.pid().unwrap();

    // WHEN: Stopping
    server.stop().unwrap();

    // THEN: Strategy consulted once, process killed and reaped
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!is_alive(pid));
}

/// **VALUE**: Verifies that a process-table miss does not stand in for "already exited".
///
/// **WHY THIS MATTERS**: The lookup can miss a child that is still running. Skipping the
/// kill on that answer leaves `stop()` blocked in `wait()` for as long as the child lives.
///
/// **BUG THIS CATCHES**: Would catch `NotFound` short-circuiting past the force kill.
#[test]
fn given_strategy_reporting_not_found_for_live_child_when_stopped_then_kills_and_returns() {
    // GIVEN: A live companion and a strategy that claims it does not exist
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER))
        .with_shutdown(FixedAnswerShutdown::boxed(ShutdownRequest::NotFound, &calls));
    server.start().unwrap();
    let pid = server.pid().unwrap();

    // WHEN: Stopping
    let started = Instant::now();
    server.stop().unwrap();

    // THEN: Returned promptly with the child killed and reaped
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!is_alive(pid));
}

/// **VALUE**: Verifies that the interrupt strategy reaches a companion that handles it.
///
/// **BUG THIS CATCHES**: Would catch `InterruptSignal` reporting `Sent` without delivering,
/// which would hide behind the force kill and skip the companion's own shutdown.
#[test]
fn given_companion_handling_interrupt_when_stopped_with_interrupt_then_exits_gracefully() {
    // GIVEN: A companion that logs when it receives SIGINT
    let dir = tempfile::tempdir().unwrap();
    let script = concat!(
        "trap 'echo interrupted-gracefully; exit 0' INT\n",
        "echo armed\n",
        "while true; do sleep 0.05; done\n",
    );
    let mut server = CompanionServer::new(script_companion(dir.path(), script))
        .with_shutdown(Box::new(InterruptSignal));
    server.start().unwrap();
    let log_path = server.log_path().unwrap().to_path_buf();
    wait_for_file_containing(&log_path, "armed", LOG_WAIT);

    // WHEN: Stopping
    server.stop().unwrap();

    // THEN: The trap ran
    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("interrupted-gracefully"), "log was: {contents}");
}

#[test]
fn given_stopped_server_when_started_again_then_new_process_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER));
    server.start().unwrap();
    let first_pid = server.pid().unwrap();
    server.stop().unwrap();

    server.start().unwrap();
    let second_pid = server.pid().unwrap();

    assert_ne!(first_pid, second_pid);
    assert!(is_alive(second_pid));
    server.stop().unwrap();
}

#[test]
fn given_companion_that_already_exited_when_stopped_then_clears_handle() {
    // GIVEN: A companion that exits on its own
    let dir = tempfile::tempdir().unwrap();
    let mut server = CompanionServer::new(script_companion(dir.path(), "exit 3\n"));
    server.start().unwrap();
    std::thread::sleep(Duration::from_millis(300));

    // WHEN / THEN: stop() still succeeds and clears the handle
    assert!(server.stop().is_ok());
    assert!(!server.is_running());
}

// ----------------------------------------------------------------------------
// Drop
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the scoped-resource guarantee: dropping the handle stops the child.
///
/// **WHY THIS MATTERS**: This is the only thing standing between a forgotten `stop()` and a
/// background companion per client instance, each holding a port and a signing session.
///
/// **BUG THIS CATCHES**: Would catch the `Drop` impl being removed or made to skip `wait()`.
#[test]
fn given_running_server_when_dropped_then_process_terminated() {
    // GIVEN: A running companion
    let dir = tempfile::tempdir().unwrap();
    let pid = {
        let mut server = CompanionServer::new(script_companion(dir.path(), SLEEPER));
        server.start().unwrap();
        let pid = server.pid().unwrap();
        assert!(is_alive(pid));
        pid
        // WHEN: The handle goes out of scope here
    };

    // THEN: The process is gone
    assert!(!is_alive(pid), "PID {pid} outlived its handle");
}
