//! Supervision of a companion runtime process and a JSON-over-HTTP client for it.
//!
//! The companion is an external server that does the real work (script execution,
//! wallet creation, signing). This crate starts it as a child process bound to a
//! port, waits until it reports ready, forwards requests to it, and guarantees the
//! child is terminated and reaped when the owning client goes away.

pub mod client;
pub mod config;
pub mod error;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use client::{CompanionClient, RpcResponse, connect};
pub use config::CompanionConfig;
pub use supervisor::CompanionServer;

pub const COMPANION_SERVER_HOSTNAME: &str = "localhost";
pub const COMPANION_SERVER_BASE_URL: &str =
    const_format::concatcp!("http://", COMPANION_SERVER_HOSTNAME);
/// Environment variable the companion reads its listening port from.
pub const COMPANION_PORT_ENV_VAR: &str = "PORT";
pub const DEFAULT_COMPANION_PORT: u16 = 3092;
