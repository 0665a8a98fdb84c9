use crate::COMPANION_PORT_ENV_VAR;
use crate::config::CompanionConfig;
use crate::error::supervisor::SupervisorError;

use std::env::current_exe;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

/// Resolve the companion's working directory.
///
/// Relative paths are taken relative to the directory of the running executable,
/// which is where an installed companion bundle sits next to the binary.
pub(crate) fn resolve_server_dir(configured: &Path) -> Result<PathBuf, SupervisorError> {
    let dir = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        let exe = current_exe().map_err(|e| {
            SupervisorError::installation(format!("Failed to get current executable path: {e}"))
        })?;
        let exe_dir = exe.parent().ok_or_else(|| {
            SupervisorError::installation(format!(
                "Executable has no parent directory: {}",
                exe.display()
            ))
        })?;
        exe_dir.join(configured)
    };

    if !dir.is_dir() {
        return Err(SupervisorError::installation(format!(
            "Companion directory not found at {}: this is likely an installation issue",
            dir.display()
        )));
    }

    Ok(dir)
}

pub(crate) fn locate_entry_point(
    server_dir: &Path,
    entry_point: &str,
) -> Result<PathBuf, SupervisorError> {
    let path = server_dir.join(entry_point);

    if !path.is_file() {
        return Err(SupervisorError::installation(format!(
            "Companion entry point not found at {}: this is likely an installation issue",
            path.display()
        )));
    }

    debug!("Companion entry point: {}", path.display());
    Ok(path)
}

/// Open the append-mode file that receives the companion's stdout and stderr.
pub(crate) fn open_log_sink(
    server_dir: &Path,
    log_file: &Path,
) -> Result<(File, PathBuf), SupervisorError> {
    let path = if log_file.is_absolute() {
        log_file.to_path_buf()
    } else {
        server_dir.join(log_file)
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            SupervisorError::log_sink(format!("Failed to open log file {}", path.display()), e)
        })?;

    Ok((file, path))
}

/// Build the launch command: program, entry point, extra args, injected port, working dir.
///
/// Stdio is left to the caller.
pub(crate) fn build_launch_command(config: &CompanionConfig, server_dir: &Path) -> Command {
    let mut cmd = Command::new(&config.program);
    cmd.arg(&config.entry_point)
        .args(&config.extra_args)
        .env(COMPANION_PORT_ENV_VAR, config.port.to_string())
        .current_dir(server_dir);

    // Own process group, so a console Ctrl-Break can target the companion alone.
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    cmd
}

pub(crate) fn describe_command(config: &CompanionConfig) -> String {
    let mut parts = vec![config.program.as_str(), config.entry_point.as_str()];
    parts.extend(config.extra_args.iter().map(String::as_str));
    parts.join(" ")
}
