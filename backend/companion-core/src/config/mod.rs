use crate::error::config::ConfigError;
use crate::{COMPANION_SERVER_BASE_URL, DEFAULT_COMPANION_PORT};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const ENV_PORT: &str = "COMPANION_PORT";
pub const ENV_SERVER_DIR: &str = "COMPANION_SERVER_DIR";
pub const ENV_PROGRAM: &str = "COMPANION_PROGRAM";
pub const ENV_READY_TIMEOUT_SECS: &str = "COMPANION_READY_TIMEOUT_SECS";

// ============================================
// CONFIG STRUCT
// ============================================

/// How to launch the companion and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanionConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Working directory of the companion. Relative paths resolve against the
    /// directory holding the running executable.
    #[serde(default = "default_server_dir")]
    pub server_dir: PathBuf,

    #[serde(default = "default_program")]
    pub program: String,

    /// First argument to `program`; must exist inside `server_dir`.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Sink for the companion's stdout and stderr, relative to `server_dir` unless absolute.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Attach to a companion that already answers ready on `port` instead of spawning one.
    #[serde(default = "default_reuse_running")]
    pub reuse_running: bool,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            server_dir: default_server_dir(),
            program: default_program(),
            entry_point: default_entry_point(),
            extra_args: Vec::new(),
            log_file: default_log_file(),
            ready_timeout_secs: default_ready_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            request_timeout_secs: None,
            reuse_running: default_reuse_running(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_port() -> u16 {
    DEFAULT_COMPANION_PORT
}
fn default_server_dir() -> PathBuf {
    PathBuf::from("companion")
}
fn default_program() -> String {
    "node".to_string()
}
fn default_entry_point() -> String {
    "bundled_server.js".to_string()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("server.log")
}
fn default_ready_timeout_secs() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_shutdown_grace_secs() -> u64 {
    5
}
fn default_reuse_running() -> bool {
    true
}

// ============================================
// IMPLEMENTATION
// ============================================

impl CompanionConfig {
    /// Load config from a JSON file.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read,
    /// parsed, or validated is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: CompanionConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON at {}: {e}", path.display());
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Defaults plus `COMPANION_*` overrides from the process environment.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_with_env(None)
    }

    /// [`load`](Self::load) the file if given (defaults otherwise), then apply
    /// `COMPANION_*` environment overrides on top.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COMPANION_*` overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_override(ENV_PORT, &port)?;
        }
        if let Some(dir) = lookup(ENV_SERVER_DIR) {
            self.server_dir = PathBuf::from(dir);
        }
        if let Some(program) = lookup(ENV_PROGRAM) {
            self.program = program;
        }
        if let Some(secs) = lookup(ENV_READY_TIMEOUT_SECS) {
            self.ready_timeout_secs = parse_override(ENV_READY_TIMEOUT_SECS, &secs)?;
        }
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(validation_error("port must be non-zero"));
        }

        if self.program.trim().is_empty() {
            return Err(validation_error("program cannot be empty"));
        }

        if self.entry_point.trim().is_empty() {
            return Err(validation_error("entry_point cannot be empty"));
        }

        if self.log_file.as_os_str().is_empty() {
            return Err(validation_error("log_file cannot be empty"));
        }

        if self.ready_timeout_secs == 0 {
            return Err(validation_error("ready_timeout_secs must be greater than 0"));
        }

        if self.poll_interval_ms == 0 || self.poll_interval() > self.ready_timeout() {
            return Err(validation_error(format!(
                "poll_interval_ms must be within 1..={} (got {})",
                self.ready_timeout().as_millis(),
                self.poll_interval_ms
            )));
        }

        Ok(())
    }

    pub fn base_url(&self) -> String {
        format!("{COMPANION_SERVER_BASE_URL}:{}", self.port)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[track_caller]
fn validation_error(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        location: ErrorLocation::from(Location::caller()),
        reason: reason.into(),
    }
}

#[track_caller]
fn parse_override<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| validation_error(format!("{key}={raw} is not a valid value")))
}
