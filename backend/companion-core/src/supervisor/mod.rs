//! Ownership of a single companion process.
//!
//! [`CompanionServer`] is the server handle: empty until [`start`](CompanionServer::start),
//! holding exactly one child afterwards, and empty again once
//! [`stop`](CompanionServer::stop) has terminated and reaped it. Dropping the handle
//! stops the child, so a companion can never outlive the value that started it.

pub mod launch;
pub mod process;
pub mod shutdown;

use crate::config::CompanionConfig;
use crate::error::supervisor::SupervisorError;
use crate::supervisor::launch::{
    build_launch_command, describe_command, locate_entry_point, open_log_sink, resolve_server_dir,
};
use crate::supervisor::shutdown::{GracefulShutdown, ShutdownRequest, platform_shutdown};

use common::ErrorLocation;
use models::{ServerInfo, ServerInfoBuilder};

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::thread::sleep;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, error, info, trace, warn};

const EXIT_POLL_INITIAL_INTERVAL: Duration = Duration::from_millis(20);
const EXIT_POLL_MAX_INTERVAL: Duration = Duration::from_millis(250);

struct RunningCompanion {
    child: Child,
    info: ServerInfo,
    log_path: PathBuf,
}

pub struct CompanionServer {
    config: CompanionConfig,
    shutdown: Box<dyn GracefulShutdown>,
    running: Option<RunningCompanion>,
}

impl CompanionServer {
    pub fn new(config: CompanionConfig) -> Self {
        Self {
            config,
            shutdown: platform_shutdown(),
            running: None,
        }
    }

    /// Replace the platform's graceful-shutdown strategy.
    pub fn with_shutdown(mut self, shutdown: Box<dyn GracefulShutdown>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Launch the companion if it is not already running.
    ///
    /// The configured port is injected as `PORT`, the working directory is the
    /// server directory, and stdout/stderr are appended to the log file. This does
    /// not wait for readiness.
    ///
    /// # Errors
    ///
    /// * [`SupervisorError::Installation`] - server directory, entry point, or program missing
    /// * [`SupervisorError::LogSink`] - log file cannot be opened
    /// * [`SupervisorError::Spawn`] - the OS refused to start the process
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if let Some(running) = &self.running {
            debug!(
                "Companion already running (PID: {}), start is a no-op",
                running.info.pid
            );
            return Ok(());
        }

        let server_dir = resolve_server_dir(&self.config.server_dir)?;
        locate_entry_point(&server_dir, &self.config.entry_point)?;
        let (stdout_log, log_path) = open_log_sink(&server_dir, &self.config.log_file)?;
        let stderr_log = stdout_log.try_clone().map_err(|e| {
            SupervisorError::log_sink(
                format!("Failed to duplicate log handle for {}", log_path.display()),
                e,
            )
        })?;

        let command_line = describe_command(&self.config);
        info!(
            "Starting companion `{command_line}` on port {} in {}",
            self.config.port,
            server_dir.display()
        );

        let mut child = build_launch_command(&self.config, &server_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => SupervisorError::installation(format!(
                    "Companion launcher `{}` not found: {err}",
                    self.config.program
                )),
                _ => SupervisorError::Spawn {
                    message: format!("Failed to spawn `{command_line}`: {err}"),
                    location: ErrorLocation::from(Location::caller()),
                    source: Box::new(err),
                },
            })?;

        let pid = child.id();
        let info = match ServerInfoBuilder::default()
            .with_pid(pid)
            .with_port(self.config.port)
            .with_base_url(self.config.base_url())
            .with_command(command_line)
            .build()
        {
            Ok(info) => info,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        };

        info!(
            "Companion started (PID: {pid}), output logged to {}",
            log_path.display()
        );

        self.running = Some(RunningCompanion {
            child,
            info,
            log_path,
        });

        Ok(())
    }

    /// Terminate the companion and wait until it has exited.
    ///
    /// Sends the graceful-shutdown signal, waits up to the configured grace
    /// period, then force-kills. The handle is cleared only after the child has
    /// been reaped. A no-op when nothing is running.
    pub fn stop(&mut self) -> Result<(), SupervisorError> {
        let grace = self.config.shutdown_grace();

        let Some(running) = self.running.as_mut() else {
            debug!("No companion running, stop is a no-op");
            return Ok(());
        };

        let pid = running.info.pid;

        match running.child.try_wait() {
            Ok(Some(status)) => {
                info!("Companion (PID: {pid}) had already exited with {status}");
                self.running = None;
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                return Err(SupervisorError::shutdown(
                    format!("Failed to query companion (PID: {pid}) status"),
                    e,
                ));
            }
        }

        info!(
            "Stopping companion (PID: {pid}) with {} signal",
            self.shutdown.name()
        );

        // A lookup miss is not proof of exit; only `try_wait` is.
        let exited = match self.shutdown.request_shutdown(pid) {
            ShutdownRequest::Sent => wait_for_exit(&mut running.child, grace)?,
            other => {
                debug!("Graceful shutdown of PID {pid} not possible ({other:?})");
                false
            }
        };

        if !exited {
            warn!("Companion (PID: {pid}) did not exit within {grace:?}, killing");
            if let Err(e) = running.child.kill()
                && e.kind() != ErrorKind::InvalidInput
            {
                return Err(SupervisorError::shutdown(
                    format!("Failed to kill companion (PID: {pid})"),
                    e,
                ));
            }
        }

        let status = running.child.wait().map_err(|e| {
            SupervisorError::shutdown(format!("Failed to wait for companion (PID: {pid})"), e)
        })?;

        info!("Companion (PID: {pid}) stopped with {status}");
        self.running = None;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.info.pid)
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.running.as_ref().map(|r| &r.info)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.running.as_ref().map(|r| r.log_path.as_path())
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }
}

impl Drop for CompanionServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop companion on drop: {e}");
        }
    }
}

/// Poll `try_wait` with backoff until the child exits or `grace` elapses.
fn wait_for_exit(child: &mut Child, grace: Duration) -> Result<bool, SupervisorError> {
    let mut backoff = ExponentialBackoff {
        initial_interval: EXIT_POLL_INITIAL_INTERVAL,
        max_interval: EXIT_POLL_MAX_INTERVAL,
        max_elapsed_time: Some(grace),
        ..Default::default()
    };
    backoff.reset();

    loop {
        match child.try_wait() {
            Ok(Some(_)) => return Ok(true),
            Ok(None) => {}
            Err(e) => {
                return Err(SupervisorError::shutdown(
                    format!("Failed to poll companion (PID: {})", child.id()),
                    e,
                ));
            }
        }

        match backoff.next_backoff() {
            Some(duration) => {
                trace!("Companion still running, rechecking after {duration:?}");
                sleep(duration);
            }
            None => return Ok(false),
        }
    }
}
