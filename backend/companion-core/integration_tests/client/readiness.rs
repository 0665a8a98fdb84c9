// Readiness polling as seen through `attach` and `wait_until_ready`.

use crate::helpers::{fast_config, free_port};

use companion_core::CompanionClient;
use companion_core::error::{ClientError, CoreError};

use std::net::TcpListener;
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ready_reply(ready: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ready": ready }))
}

async fn readiness_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/isReady")
        .count()
}

/// **VALUE**: Verifies that a not-ready reply is retried after one poll interval.
///
/// **WHY THIS MATTERS**: The companion answers `{"ready": false}` while its network
/// client warms up. Treating that as final would make every cold start fail.
///
/// **BUG THIS CATCHES**: Would catch the loop returning on the first successful HTTP
/// reply regardless of its content, or hammering the companion without pausing.
#[tokio::test]
async fn given_not_ready_then_ready_when_attaching_then_succeeds_after_one_interval() {
    // GIVEN: A companion that reports not ready exactly once
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ready_reply(false))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ready_reply(true))
        .mount(&server)
        .await;
    let config = fast_config(free_port());

    // WHEN: Attaching
    let started = Instant::now();
    let result = CompanionClient::attach(&server.uri(), &config).await;

    // THEN: Ready on the second probe, after at least one interval
    assert!(result.is_ok(), "got {:?}", result.err());
    assert!(started.elapsed() >= config.poll_interval());
    assert_eq!(readiness_requests(&server).await, 2);
}

#[tokio::test]
async fn given_never_ready_when_attaching_then_times_out_near_deadline() {
    // GIVEN: A companion that never becomes ready, with a 1s timeout
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ready_reply(false))
        .mount(&server)
        .await;
    let config = fast_config(free_port());

    // WHEN: Attaching
    let started = Instant::now();
    let result = CompanionClient::attach(&server.uri(), &config).await;

    // THEN: Startup timeout, close to the configured deadline
    let elapsed = started.elapsed();
    match result {
        Err(CoreError::Client(ClientError::StartupTimeout {
            timeout,
            last_probe,
            ..
        })) => {
            assert_eq!(timeout, config.ready_timeout());
            assert_eq!(last_probe, "reported not ready");
        }
        Err(other) => panic!("Expected StartupTimeout, got {other:?}"),
        Ok(_) => panic!("Expected StartupTimeout, got a client"),
    }
    assert!(elapsed >= config.ready_timeout());
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert!(readiness_requests(&server).await > 1);
}

/// **VALUE**: Verifies that connection refusals count as "not yet", never as a hard error.
///
/// **WHY THIS MATTERS**: Right after spawn nothing is listening. Propagating the first
/// connection error would make startup fail on every machine slower than the first probe.
#[tokio::test]
async fn given_nothing_listening_when_attaching_then_startup_timeout_not_http_error() {
    // GIVEN: A port with no listener
    let config = fast_config(free_port());
    let base_url = format!("http://127.0.0.1:{}", config.port);

    // WHEN: Attaching
    let result = CompanionClient::attach(&base_url, &config).await;

    // THEN: The deadline ends the wait, the last probe explains why
    match result {
        Err(CoreError::Client(ClientError::StartupTimeout { last_probe, .. })) => {
            assert!(last_probe.starts_with("unreachable"), "last probe: {last_probe}");
        }
        Err(other) => panic!("Expected StartupTimeout, got {other:?}"),
        Ok(_) => panic!("Expected StartupTimeout, got a client"),
    }
}

#[tokio::test]
async fn given_companion_listening_late_when_attaching_then_succeeds() {
    // GIVEN: A companion that binds its port only after a few refused probes
    let port = free_port();
    let mut config = fast_config(port);
    config.ready_timeout_secs = 5;
    let late_server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).expect("rebind freed port");
        let server = MockServer::builder().listener(listener).start().await;
        Mock::given(method("POST"))
            .and(path("/isReady"))
            .respond_with(ready_reply(true))
            .mount(&server)
            .await;
        server
    });

    // WHEN: Attaching before it is up
    let result = CompanionClient::attach(&format!("http://127.0.0.1:{port}"), &config).await;

    // THEN: Ready once it starts listening
    assert!(result.is_ok(), "got {:?}", result.err());
    drop(late_server.await);
}

#[tokio::test]
async fn given_error_status_then_ready_when_attaching_then_succeeds() {
    // GIVEN: A companion that returns 500 until its client initializes
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "not initialized" })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ready_reply(true))
        .mount(&server)
        .await;

    // WHEN: Attaching
    let result = CompanionClient::attach(&server.uri(), &fast_config(free_port())).await;

    // THEN: The 500s were treated as not ready yet
    assert!(result.is_ok(), "got {:?}", result.err());
    assert_eq!(readiness_requests(&server).await, 3);
}

#[tokio::test]
async fn given_ready_client_when_waiting_again_then_returns_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ready_reply(true))
        .mount(&server)
        .await;
    let client = CompanionClient::attach(&server.uri(), &fast_config(free_port()))
        .await
        .unwrap();

    let result = client.wait_until_ready(Duration::from_millis(500)).await;

    assert!(result.is_ok());
    assert_eq!(readiness_requests(&server).await, 2);
}

/// **VALUE**: Verifies that the largest timeout `validate()` accepts does not overflow the deadline.
///
/// **WHY THIS MATTERS**: `COMPANION_READY_TIMEOUT_SECS` is user input. A value too large to add
/// to the current instant used to panic inside the readiness wait instead of waiting.
///
/// **BUG THIS CATCHES**: Would catch `Instant + Duration` coming back in place of `checked_add`.
#[tokio::test]
async fn given_maximum_ready_timeout_when_attaching_then_waits_without_panicking() {
    // GIVEN: A ready companion and a timeout of u64::MAX seconds that passes validation
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/isReady"))
        .respond_with(ready_reply(true))
        .mount(&server)
        .await;
    let mut config = fast_config(free_port());
    config.ready_timeout_secs = u64::MAX;
    assert!(config.validate().is_ok());

    // WHEN: Attaching
    let result = CompanionClient::attach(&server.uri(), &config).await;

    // THEN: Ready, no overflow
    assert!(result.is_ok(), "got {:?}", result.err());
}
