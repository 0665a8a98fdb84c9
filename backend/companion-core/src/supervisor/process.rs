//! Process-table lookups via `sysinfo`.

use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, System};

/// Run `f` against the live process-table entry for `pid`, if there is one.
pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    sys.process(pid).map(f)
}

/// Whether `pid` names a running process.
///
/// Zombies (exited but not yet reaped) count as not alive.
pub fn is_alive(pid: u32) -> bool {
    with_process(pid, |p| p.status() != ProcessStatus::Zombie).unwrap_or(false)
}
