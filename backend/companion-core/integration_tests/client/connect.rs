// `CompanionClient::connect`: attach-or-spawn, readiness, and cleanup on failure.

use crate::helpers::{fast_config, free_port};

use companion_core::error::{ClientError, CoreError, SupervisorError};
use companion_core::{CompanionClient, CompanionConfig};

use std::net::TcpListener;
use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A ready mock companion listening on a known port, so a config can point at it.
async fn ready_companion_on_port() -> (MockServer, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    let server = MockServer::builder().listener(listener).start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ready": true })))
        .mount(&server)
        .await;
    (server, port)
}

fn missing_server_dir() -> PathBuf {
    std::env::temp_dir().join("companion-core-tests-no-such-dir")
}

/// **VALUE**: Verifies that a companion already serving the port is reused, not duplicated.
///
/// **WHY THIS MATTERS**: A second spawn on an occupied port dies on bind, and the caller
/// would see a startup timeout although a perfectly good companion is running.
///
/// **BUG THIS CATCHES**: Would catch `connect` skipping the attach probe, or taking
/// ownership of a process it did not start (and later killing it).
#[tokio::test]
async fn given_companion_already_running_when_connecting_with_reuse_then_attaches() {
    // GIVEN: A ready companion on the configured port and no bundle on disk
    let (_server, port) = ready_companion_on_port().await;
    let config = CompanionConfig {
        server_dir: missing_server_dir(),
        reuse_running: true,
        ..fast_config(port)
    };

    // WHEN: Connecting
    let client = CompanionClient::connect(config).await.unwrap();

    // THEN: Attached, nothing owned
    assert!(!client.owns_process());
    assert!(client.server_info().is_none());
    assert_eq!(client.base_url().as_str(), format!("http://localhost:{port}/"));
    assert!(client.close().await.is_ok());
}

#[tokio::test]
async fn given_missing_bundle_when_connecting_without_reuse_then_installation_error() {
    // GIVEN: No companion running and no bundle on disk
    let config = CompanionConfig {
        server_dir: missing_server_dir(),
        ..fast_config(free_port())
    };

    // WHEN: Connecting
    let result = CompanionClient::connect(config).await;

    // THEN: Installation error before any readiness wait
    match result {
        Err(CoreError::Supervisor(SupervisorError::Installation { message, .. })) => {
            assert!(message.contains("companion-core-tests-no-such-dir"), "{message}");
        }
        Err(other) => panic!("Expected Installation error, got {other:?}"),
        Ok(_) => panic!("Expected Installation error, got a client"),
    }
}

#[tokio::test]
async fn given_invalid_config_when_connecting_then_config_error() {
    let config = CompanionConfig {
        port: 0,
        ..fast_config(free_port())
    };

    let result = CompanionClient::connect(config).await;

    assert!(matches!(result, Err(CoreError::Config(_))));
}

#[cfg(unix)]
mod spawned {
    use super::*;

    use crate::helpers::{script_companion, wait_for_file_containing};

    use companion_core::supervisor::process::is_alive;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SLEEPER: &str = "exec sleep 30\n";

    /// **VALUE**: Verifies that a companion that never gets ready is stopped on timeout.
    ///
    /// **WHY THIS MATTERS**: The caller gets an error and no client, so nothing else will
    /// ever stop that process. Leaving it running leaks a port and a process per retry.
    ///
    /// **BUG THIS CATCHES**: Would catch the timeout path returning before `stop()`.
    #[tokio::test]
    async fn given_companion_never_ready_when_connecting_then_timeout_and_process_stopped() {
        // GIVEN: A companion that records its PID and never listens
        let dir = tempfile::tempdir().unwrap();
        let config = script_companion(dir.path(), "echo $$ > companion.pid\nexec sleep 30\n");

        // WHEN: Connecting
        let result = CompanionClient::connect(config).await;

        // THEN: Startup timeout
        assert!(
            matches!(
                result,
                Err(CoreError::Client(ClientError::StartupTimeout { .. }))
            ),
            "got {:?}",
            result.err()
        );

        // AND: The spawned companion is gone
        let pid_file = dir.path().join("companion.pid");
        let recorded = wait_for_file_containing(&pid_file, "\n", Duration::from_secs(1));
        let pid: u32 = recorded.trim().parse().expect("companion wrote its pid");
        assert!(!is_alive(pid), "PID {pid} survived the failed connect");
    }

    /// Spawn the script as the owned companion while the mock answers readiness on its port.
    async fn connect_owned(
        dir: &std::path::Path,
        script: &str,
    ) -> (CompanionClient, u32, MockServer) {
        let (server, port) = ready_companion_on_port().await;
        let config = CompanionConfig {
            port,
            reuse_running: false,
            shutdown_grace_secs: 1,
            ..script_companion(dir, script)
        };

        let client = CompanionClient::connect(config).await.unwrap();
        let pid = client.server_info().expect("owned companion").pid;
        (client, pid, server)
    }

    /// **VALUE**: Verifies that dropping a client without `close()` still stops its companion.
    ///
    /// **WHY THIS MATTERS**: Early returns and `?` skip explicit teardown all the time. The
    /// client must not leak a background process when that happens.
    #[tokio::test]
    async fn given_owning_client_when_dropped_then_companion_terminated() {
        // GIVEN: A client that started its companion
        let dir = tempfile::tempdir().unwrap();
        let (client, pid, _server) = connect_owned(dir.path(), SLEEPER).await;
        assert!(client.owns_process());
        assert!(is_alive(pid));

        // WHEN: Dropping it without close()
        drop(client);

        // THEN: The companion is gone
        assert!(!is_alive(pid), "PID {pid} outlived its client");
    }

    #[tokio::test]
    async fn given_owning_client_when_closed_then_companion_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let (client, pid, _server) = connect_owned(dir.path(), SLEEPER).await;

        let result = client.close().await;

        assert!(result.is_ok());
        assert!(!is_alive(pid));
    }

    /// **VALUE**: Verifies that `close()` does not stall the runtime during the grace period.
    ///
    /// **WHY THIS MATTERS**: A companion that ignores the graceful signal holds `stop()` for the
    /// whole grace period. On a single-threaded runtime a blocking stop would freeze every
    /// other task for that long.
    ///
    /// **BUG THIS CATCHES**: Would catch `close()` calling `stop()` on the async thread again.
    #[tokio::test]
    async fn given_companion_ignoring_term_when_closed_then_runtime_keeps_running() {
        // GIVEN: An owned companion that ignores SIGTERM (1s grace) and a ticking task
        let dir = tempfile::tempdir().unwrap();
        let script = "trap '' TERM\nwhile true; do sleep 0.05; done\n";
        let (client, pid, _server) = connect_owned(dir.path(), script).await;
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = Arc::clone(&ticks);
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        // WHEN: Closing the client
        let result = client.close().await;
        ticker.abort();

        // THEN: The companion was killed after the grace period while the ticker kept running
        assert!(result.is_ok());
        assert!(!is_alive(pid));
        assert!(
            ticks.load(Ordering::SeqCst) >= 20,
            "ticker advanced only {} times",
            ticks.load(Ordering::SeqCst)
        );
    }
}
