use crate::supervisor::shutdown::{
    GracefulShutdown, InterruptSignal, ShutdownRequest, TerminateSignal, platform_shutdown,
};

#[cfg(not(windows))]
#[test]
fn given_unix_like_platform_when_platform_shutdown_called_then_uses_terminate() {
    assert_eq!(platform_shutdown().name(), "terminate");
}

#[cfg(windows)]
#[test]
fn given_windows_when_platform_shutdown_called_then_uses_interrupt() {
    assert_eq!(platform_shutdown().name(), "interrupt");
}

/// **VALUE**: Verifies that signalling a PID that does not exist is reported, not panicked on.
///
/// **WHY THIS MATTERS**: The child can exit between `try_wait` and the signal. The supervisor
/// treats `NotFound` as "already gone" and goes straight to reaping.
#[test]
fn given_nonexistent_pid_when_shutdown_requested_then_returns_not_found() {
    // GIVEN: A PID that doesn't exist
    let fake_pid = u32::MAX;

    // WHEN / THEN: Both strategies report NotFound
    assert_eq!(
        TerminateSignal.request_shutdown(fake_pid),
        ShutdownRequest::NotFound
    );
    assert_eq!(
        InterruptSignal.request_shutdown(fake_pid),
        ShutdownRequest::NotFound
    );
}
