pub mod client;
pub mod config;
pub mod supervisor;

pub use client::ClientError;
pub use config::ConfigError;
pub use supervisor::SupervisorError;

use thiserror::Error;

/// Everything that can go wrong while bringing a client up.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
