//! Error types for RPC calls against the companion.
//!
//! Everything here is transport-level. Domain failures reported by the companion
//! (`"success": false` and friends) are ordinary JSON and never become errors.

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;
use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("HTTP Error: {message} {location}")]
    Http {
        message: String,
        is_connect: bool,
        is_timeout: bool,
        location: ErrorLocation,
    },

    #[error("Server Error: HTTP {status_code} - {message} {location}")]
    Server {
        status_code: HttpStatusCode,
        message: String,
        location: ErrorLocation,
    },

    #[error("JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },

    #[error("Startup Timeout Error: companion not ready within {timeout:?} (last probe: {last_probe}) {location}")]
    StartupTimeout {
        timeout: Duration,
        last_probe: String,
        location: ErrorLocation,
    },
}

impl ClientError {
    #[track_caller]
    pub fn json(message: impl Into<String>) -> Self {
        ClientError::Json {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn startup_timeout(timeout: Duration, last_probe: impl Into<String>) -> Self {
        ClientError::StartupTimeout {
            timeout,
            last_probe: last_probe.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// HTTP status for non-2xx replies.
    pub fn status_code(&self) -> Option<HttpStatusCode> {
        match self {
            ClientError::Server { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// True when the companion could not be reached at all.
    pub fn is_connect(&self) -> bool {
        matches!(self, ClientError::Http { is_connect: true, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        ClientError::Http {
            message: error.to_string(),
            is_connect: error.is_connect(),
            is_timeout: error.is_timeout(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ClientError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for ClientError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ClientError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
