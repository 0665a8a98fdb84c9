// Unit tests for crate-private helpers.
// Public API behavior is covered in integration_tests/.

mod client;
mod config;
mod supervisor;
