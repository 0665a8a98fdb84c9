use crate::error::model_error::ModelError;
use crate::{ErrorLocation, ServerInfo};

use std::panic::Location;

/// Builder for creating validated ServerInfo instances.
#[derive(Debug, Default)]
pub struct ServerInfoBuilder {
    pid: Option<u32>,
    port: Option<u16>,
    base_url: Option<String>,
    command: Option<String>,
}

impl ServerInfoBuilder {
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_command(mut self, cmd: impl Into<String>) -> Self {
        self.command = Some(cmd.into());
        self
    }

    /// Build the ServerInfo with validation.
    #[track_caller]
    pub fn build(self) -> Result<ServerInfo, ModelError> {
        let pid = self.pid.ok_or_else(|| ModelError::validation("PID is required"))?;

        if pid == 0 {
            return Err(ModelError::validation("PID must be non-zero"));
        }

        let port = self
            .port
            .ok_or_else(|| ModelError::validation("Port is required"))?;

        if port == 0 {
            return Err(ModelError::validation("Port must be non-zero"));
        }

        let base_url = self
            .base_url
            .ok_or_else(|| ModelError::validation("Base URL is required"))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ModelError::Validation {
                message: format!("Invalid base URL format: {base_url}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let command = self
            .command
            .ok_or_else(|| ModelError::validation("Command is required"))?;

        if command.trim().is_empty() {
            return Err(ModelError::validation("Command cannot be empty"));
        }

        Ok(ServerInfo {
            pid,
            port,
            base_url,
            command,
        })
    }
}
