pub mod builder;

use serde::Serialize;

/// Snapshot of a companion process started by a supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub pid: u32,
    pub port: u16,
    pub base_url: String,
    pub command: String,
}
