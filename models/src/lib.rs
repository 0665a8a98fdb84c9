//! Domain models for the companion workspace.
//!
//! Pure data structures with validation only - no I/O and no process handling.
//! `companion-core` produces these; callers read them.

pub mod error;
pub mod server_info;

pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use server_info::ServerInfo;
pub use server_info::builder::ServerInfoBuilder;

#[cfg(test)]
mod tests;
