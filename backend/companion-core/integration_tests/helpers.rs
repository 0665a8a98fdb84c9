//! Shared fixtures for integration tests.
//!
//! - Free ports for companions that must not collide
//! - Shell-script companions in a temp directory (Unix only)
//! - A wiremock companion that already reports ready

use companion_core::CompanionConfig;

use std::net::TcpListener;
use std::path::Path;
use std::time::{Duration, Instant};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SCRIPT_NAME: &str = "companion.sh";

/// A loopback port with nothing listening on it right now.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

/// Config tuned for tests: short timeouts, fast polling, no reuse of strangers.
pub fn fast_config(port: u16) -> CompanionConfig {
    CompanionConfig {
        port,
        ready_timeout_secs: 1,
        poll_interval_ms: 50,
        shutdown_grace_secs: 2,
        reuse_running: false,
        ..Default::default()
    }
}

/// Write `script` into `dir` and return a config that runs it with `sh`.
#[cfg(unix)]
pub fn script_companion(dir: &Path, script: &str) -> CompanionConfig {
    std::fs::write(dir.join(SCRIPT_NAME), script).expect("write companion script");

    CompanionConfig {
        server_dir: dir.to_path_buf(),
        program: "sh".to_string(),
        entry_point: SCRIPT_NAME.to_string(),
        ..fast_config(free_port())
    }
}

/// Poll a file until it contains `needle`; returns the contents seen last.
pub fn wait_for_file_containing(path: &Path, needle: &str, timeout: Duration) -> String {
    let deadline = Instant::now() + timeout;
    loop {
        let contents = std::fs::read_to_string(path).unwrap_or_default();
        if contents.contains(needle) || Instant::now() >= deadline {
            return contents;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// A mock companion whose `/isReady` always answers `{"ready": true}`.
pub async fn ready_companion() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ready": true })))
        .mount(&server)
        .await;
    server
}
