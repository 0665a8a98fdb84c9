use crate::client::readiness::{
    ProbeOutcome, probe_ready, reply_signals_ready, time_left,
};

use common::HttpStatusCode;

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::json;
use url::Url;

/// **VALUE**: Verifies that only a literal boolean `true` counts as ready.
///
/// **WHY THIS MATTERS**: While the companion is still initializing its network client the
/// `ready` field can be missing, `false`, or `null`. Treating any of those as ready would
/// release callers before the companion can serve them.
#[test]
fn given_various_replies_when_checked_then_only_true_signals_ready() {
    assert!(reply_signals_ready(&json!({ "ready": true })));
    assert!(!reply_signals_ready(&json!({ "ready": false })));
    assert!(!reply_signals_ready(&json!({ "ready": null })));
    assert!(!reply_signals_ready(&json!({ "ready": "true" })));
    assert!(!reply_signals_ready(&json!({ "success": false, "error": "boom" })));
    assert!(!reply_signals_ready(&json!([true])));
}

#[test]
fn given_outcomes_when_displayed_then_describe_observation() {
    assert_eq!(ProbeOutcome::NotReady.to_string(), "reported not ready");
    assert_eq!(
        ProbeOutcome::Rejected(HttpStatusCode(500)).to_string(),
        "HTTP 500"
    );
    assert!(
        ProbeOutcome::Unreachable("connection refused".to_string())
            .to_string()
            .starts_with("unreachable")
    );
}

/// **VALUE**: Verifies that a refused connection is an observation, not an error.
///
/// **BUG THIS CATCHES**: Would catch `probe_ready` propagating the transport error, which
/// would abort `wait_until_ready` on the very first probe of every cold start.
#[tokio::test]
async fn given_unreachable_port_when_probed_then_returns_unreachable() {
    // GIVEN: A port with nothing listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base_url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();

    // WHEN: Probing
    let outcome = probe_ready(&Client::new(), &base_url, Duration::from_secs(1)).await;

    // THEN: Unreachable
    assert!(
        matches!(outcome, ProbeOutcome::Unreachable(_)),
        "got {outcome:?}"
    );
}

/// **VALUE**: Verifies that a missing deadline means "no limit" rather than "expired".
///
/// **BUG THIS CATCHES**: Would catch the unbounded case being mapped to zero, which would
/// make a huge configured timeout fail before the first probe.
#[test]
fn given_no_deadline_when_time_left_computed_then_unbounded() {
    assert_eq!(time_left(None), Duration::MAX);
}

#[test]
fn given_past_deadline_when_time_left_computed_then_zero() {
    let past = Instant::now();
    std::thread::sleep(Duration::from_millis(5));

    assert_eq!(time_left(Some(past)), Duration::ZERO);
}
