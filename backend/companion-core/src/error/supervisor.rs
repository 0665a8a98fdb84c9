use common::ErrorLocation;
use models::ModelError;

use std::error::Error as StdError;
use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures while starting or stopping the companion process.
#[derive(Debug, ThisError)]
pub enum SupervisorError {
    /// The companion bundle or its launcher cannot be found.
    #[error("Installation Error: {message} {location}")]
    Installation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Log Sink Error: {message} {location}")]
    LogSink {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Shutdown Error: {message} {location}")]
    Shutdown {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    #[track_caller]
    pub fn installation(message: impl Into<String>) -> Self {
        SupervisorError::Installation {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn log_sink(message: impl Into<String>, source: IoError) -> Self {
        SupervisorError::LogSink {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }

    #[track_caller]
    pub fn shutdown(message: impl Into<String>, source: IoError) -> Self {
        SupervisorError::Shutdown {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }
}

impl From<ModelError> for SupervisorError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        SupervisorError::Validation {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
