use common::ErrorLocation;

use companion_core::error::{ClientError, ConfigError, CoreError, SupervisorError};

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the command-line front end.
///
/// Core errors keep their own kind and location in `message`; the outer
/// location records where the CLI gave up.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from this app (arguments, logging, output)
    #[error("CLI Error: {message} {location}")]
    Cli {
        message: String,
        location: ErrorLocation,
    },

    /// Error from companion-core (config, launch, RPC)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl CliError {
    #[track_caller]
    pub fn cli(message: impl Into<String>) -> Self {
        CliError::Cli {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for CliError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        CliError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ClientError> for CliError {
    #[track_caller]
    fn from(error: ClientError) -> Self {
        CliError::from(CoreError::from(error))
    }
}

impl From<SupervisorError> for CliError {
    #[track_caller]
    fn from(error: SupervisorError) -> Self {
        CliError::from(CoreError::from(error))
    }
}

impl From<ConfigError> for CliError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        CliError::from(CoreError::from(error))
    }
}
