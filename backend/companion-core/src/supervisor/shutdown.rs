//! Graceful-shutdown strategies.
//!
//! The supervisor asks one [`GracefulShutdown`] to politely stop the child and
//! falls back to a force kill itself. Which signal counts as "polite" depends on
//! the platform; [`platform_shutdown`] picks it once.

use crate::supervisor::process::with_process;

use log::{debug, trace};
use sysinfo::Signal;

/// Result of asking a process to shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    Sent,
    /// The platform cannot deliver this signal; escalate straight away.
    Unsupported,
    /// Delivery was attempted and refused.
    Failed,
    /// No such process in the process table.
    NotFound,
}

pub trait GracefulShutdown: Send + Sync {
    fn request_shutdown(&self, pid: u32) -> ShutdownRequest;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// SIGTERM.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminateSignal;

/// Console interrupt.
///
/// SIGINT on Unix. On Windows a console Ctrl-Break event sent to the child's
/// process group; the launcher starts the companion in a group of its own so
/// the event reaches only the companion.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterruptSignal;

impl GracefulShutdown for TerminateSignal {
    fn request_shutdown(&self, pid: u32) -> ShutdownRequest {
        send_signal(pid, Signal::Term)
    }

    fn name(&self) -> &'static str {
        "terminate"
    }
}

impl GracefulShutdown for InterruptSignal {
    #[cfg(not(windows))]
    fn request_shutdown(&self, pid: u32) -> ShutdownRequest {
        send_signal(pid, Signal::Interrupt)
    }

    #[cfg(windows)]
    fn request_shutdown(&self, pid: u32) -> ShutdownRequest {
        send_console_break(pid)
    }

    fn name(&self) -> &'static str {
        "interrupt"
    }
}

/// The graceful-shutdown strategy for the current platform.
pub fn platform_shutdown() -> Box<dyn GracefulShutdown> {
    #[cfg(windows)]
    {
        Box::new(InterruptSignal)
    }

    #[cfg(not(windows))]
    {
        Box::new(TerminateSignal)
    }
}

fn send_signal(pid: u32, signal: Signal) -> ShutdownRequest {
    let outcome = with_process(pid, |p| match p.kill_with(signal) {
        Some(true) => ShutdownRequest::Sent,
        Some(false) => ShutdownRequest::Failed,
        None => ShutdownRequest::Unsupported,
    })
    .unwrap_or(ShutdownRequest::NotFound);

    match outcome {
        ShutdownRequest::Sent => debug!("Sent {signal:?} to PID {pid}"),
        other => trace!("Signal {signal:?} to PID {pid} not delivered: {other:?}"),
    }

    outcome
}

/// `sysinfo` only delivers `Kill` on Windows, so the console event goes through
/// the Win32 API directly.
#[cfg(windows)]
fn send_console_break(pid: u32) -> ShutdownRequest {
    use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

    if with_process(pid, |_| ()).is_none() {
        trace!("Ctrl-Break to PID {pid} not delivered: NotFound");
        return ShutdownRequest::NotFound;
    }

    // SAFETY: both arguments are plain integers; the group id is the companion's PID.
    let delivered = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) } != 0;

    if delivered {
        debug!("Sent Ctrl-Break to process group {pid}");
        ShutdownRequest::Sent
    } else {
        trace!(
            "Ctrl-Break to process group {pid} failed: {}",
            std::io::Error::last_os_error()
        );
        ShutdownRequest::Failed
    }
}
