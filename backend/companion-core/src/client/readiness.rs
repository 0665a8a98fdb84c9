use crate::error::client::ClientError;

use common::HttpStatusCode;

use std::fmt;
use std::time::{Duration, Instant};

use backoff::backoff::{Backoff, Constant};
use log::{debug, info, trace};
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep as TokioSleep;
use url::Url;

pub(crate) const READINESS_ENDPOINT: &str = "isReady";
const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// What a single readiness probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbeOutcome {
    Ready,
    NotReady,
    Unreachable(String),
    Rejected(HttpStatusCode),
    Undecodable(String),
}

impl ProbeOutcome {
    pub(crate) fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Ready => write!(f, "ready"),
            ProbeOutcome::NotReady => write!(f, "reported not ready"),
            ProbeOutcome::Unreachable(reason) => write!(f, "unreachable: {reason}"),
            ProbeOutcome::Rejected(status) => write!(f, "HTTP {status}"),
            ProbeOutcome::Undecodable(reason) => write!(f, "undecodable reply: {reason}"),
        }
    }
}

/// Interpret a readiness reply body. Only a literal `"ready": true` counts.
pub(crate) fn reply_signals_ready(body: &Value) -> bool {
    body.get("ready").and_then(Value::as_bool) == Some(true)
}

/// Issue one `POST /isReady` with no body.
pub(crate) async fn probe_ready(http: &Client, base_url: &Url, timeout: Duration) -> ProbeOutcome {
    let url = match base_url.join(READINESS_ENDPOINT) {
        Ok(url) => url,
        Err(e) => return ProbeOutcome::Unreachable(e.to_string()),
    };

    let response = match http.post(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return ProbeOutcome::Unreachable(e.to_string()),
    };

    let status = response.status();
    if !status.is_success() {
        return ProbeOutcome::Rejected(HttpStatusCode(status.as_u16()));
    }

    match response.json::<Value>().await {
        Ok(body) if reply_signals_ready(&body) => ProbeOutcome::Ready,
        Ok(_) => ProbeOutcome::NotReady,
        Err(e) => ProbeOutcome::Undecodable(e.to_string()),
    }
}

/// Probe every `interval` until the companion reports ready or `timeout` elapses.
///
/// Connection failures and not-ready replies keep the loop going; only the
/// deadline ends it with [`ClientError::StartupTimeout`].
pub(crate) async fn wait_until_ready(
    http: &Client,
    base_url: &Url,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ClientError> {
    let started = Instant::now();
    // An unrepresentable deadline means wait indefinitely.
    let deadline = started.checked_add(timeout);
    let mut schedule = Constant::new(interval);
    let mut last_probe = String::from("no probe completed");
    let mut attempts: u32 = 0;

    debug!("Waiting up to {timeout:?} for companion at {base_url}");

    loop {
        let remaining = time_left(deadline);
        if remaining.is_zero() {
            return Err(ClientError::startup_timeout(timeout, last_probe));
        }

        attempts += 1;
        let outcome = probe_ready(http, base_url, remaining.min(PROBE_REQUEST_TIMEOUT)).await;

        if outcome.is_ready() {
            info!(
                "Companion at {base_url} ready after {:?} ({attempts} probes)",
                started.elapsed()
            );
            return Ok(());
        }

        trace!("Readiness probe {attempts} at {base_url}: {outcome}");
        last_probe = outcome.to_string();

        let remaining = time_left(deadline);
        if remaining.is_zero() {
            return Err(ClientError::startup_timeout(timeout, last_probe));
        }

        let pause = schedule.next_backoff().unwrap_or(interval);
        TokioSleep(pause.min(remaining)).await;
    }
}

/// Time until `deadline`; `Duration::MAX` when there is none.
pub(crate) fn time_left(deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()),
        None => Duration::MAX,
    }
}
