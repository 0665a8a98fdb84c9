//! Shared building blocks for the companion workspace.
//!
//! This crate holds the small utilities every other crate leans on:
//! call-site error locations, HTTP status categorization, and secret
//! handling that keeps tokens out of logs.
//!
//! ## Architecture
//!
//! - **common** (this crate): Error plumbing and secret wrappers
//! - **models**: Pure data passed between layers
//! - **companion-core**: Process supervision and the RPC client
//! - **companion-cli**: Command-line wiring

pub mod error;
pub mod http_status;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_secret::RedactedSecret;

#[cfg(test)]
mod tests;
