//! JSON-over-HTTP client for the companion.
//!
//! A [`CompanionClient`] is only handed out once the companion has answered a
//! readiness probe. Every call is a plain request/response pass-through: request
//! bodies are built from the arguments, replies come back verbatim as JSON maps,
//! nothing is validated or retried, and transport failures surface unchanged.

pub(crate) mod readiness;
pub(crate) mod requests;

use crate::client::readiness::{probe_ready, wait_until_ready};
use crate::client::requests::{ExecuteJsRequest, SetAuthTokenRequest, SignRequest};
use crate::config::CompanionConfig;
use crate::error::CoreError;
use crate::error::client::ClientError;
use crate::error::supervisor::SupervisorError;
use crate::supervisor::CompanionServer;

use common::{ErrorLocation, HttpStatusCode, RedactedSecret};
use models::ServerInfo;

use std::io::Error as IoError;
use std::panic::Location;
use std::time::Duration;

use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::task::spawn_blocking;
use url::Url;

/// A companion reply: string keys to arbitrary JSON, exactly as received.
pub type RpcResponse = Map<String, Value>;

const EXECUTE_JS_ENDPOINT: &str = "executeJs";
const CREATE_WALLET_ENDPOINT: &str = "createWallet";
const SIGN_ENDPOINT: &str = "sign";
const SET_AUTH_TOKEN_ENDPOINT: &str = "setAuthToken";
const PKP_ENDPOINT: &str = "pkp";
const ATTACH_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// A client for a companion that has answered ready.
///
/// Dropping a client that owns its companion stops it on the dropping thread,
/// which blocks for up to the shutdown grace period. Async callers should
/// [`close`](Self::close) it instead.
pub struct CompanionClient {
    base_url: Url,
    http: Client,
    poll_interval: Duration,
    server: Option<CompanionServer>,
}

/// Connect using `.env` plus `COMPANION_*` environment overrides on the defaults.
pub async fn connect() -> Result<CompanionClient, CoreError> {
    let config = CompanionConfig::from_env()?;
    CompanionClient::connect(config).await
}

impl CompanionClient {
    /// Start a companion for `config` and wait until it is ready.
    ///
    /// When `reuse_running` is set and a companion already answers ready on the
    /// port, the client attaches to it and owns no process.
    ///
    /// # Errors
    ///
    /// * [`CoreError::Config`] - invalid config
    /// * [`CoreError::Supervisor`] - the companion could not be launched
    /// * [`CoreError::Client`] - readiness was not signaled in time; the process
    ///   started for this call has been stopped again
    pub async fn connect(config: CompanionConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let mut client = Self::unstarted(&config.base_url(), &config)?;

        if config.reuse_running
            && probe_ready(&client.http, &client.base_url, ATTACH_PROBE_TIMEOUT)
                .await
                .is_ready()
        {
            info!(
                "Companion already serving at {}, attaching without spawning",
                client.base_url
            );
            return Ok(client);
        }

        let mut server = CompanionServer::new(config.clone());
        server.start()?;
        client.server = Some(server);

        if let Err(e) = client.wait_until_ready(config.ready_timeout()).await {
            warn!("Companion did not become ready: {e}");
            if let Some(server) = client.server.take()
                && let Err(stop_err) = stop_off_runtime(server).await
            {
                error!("Failed to stop companion after startup timeout: {stop_err}");
            }
            return Err(e.into());
        }

        Ok(client)
    }

    /// Wait for an externally managed companion at `base_url`. The client owns no process.
    pub async fn attach(base_url: &str, config: &CompanionConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let client = Self::unstarted(base_url, config)?;
        client.wait_until_ready(config.ready_timeout()).await?;
        Ok(client)
    }

    fn unstarted(base_url: &str, config: &CompanionConfig) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            http: builder.build()?,
            poll_interval: config.poll_interval(),
            server: None,
        })
    }

    /// Block until the companion answers `{"ready": true}` or `timeout` elapses.
    ///
    /// Connection refusals and not-ready replies are retried every poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::StartupTimeout`] once the deadline passes.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), ClientError> {
        wait_until_ready(&self.http, &self.base_url, timeout, self.poll_interval).await
    }

    /// Run script code in the companion; `POST /executeJs` with `{"code"}`.
    pub async fn execute_js(&self, code: &str) -> Result<RpcResponse, ClientError> {
        self.execute_js_with_params(code, None).await
    }

    /// Like [`execute_js`](Self::execute_js), also passing `jsParams` to the script.
    pub async fn execute_js_with_params(
        &self,
        code: &str,
        js_params: Option<&Value>,
    ) -> Result<RpcResponse, ClientError> {
        let body = ExecuteJsRequest { code, js_params };
        debug!("Executing {} bytes of code", code.len());
        self.post_json(EXECUTE_JS_ENDPOINT, Some(&body)).await
    }

    /// `POST /createWallet` with no body.
    pub async fn create_wallet(&self) -> Result<RpcResponse, ClientError> {
        self.post_json::<()>(CREATE_WALLET_ENDPOINT, None).await
    }

    /// `POST /sign` with `{"toSign", "pkpPublicKey"}`.
    pub async fn sign(
        &self,
        to_sign: &str,
        pkp_public_key: &str,
    ) -> Result<RpcResponse, ClientError> {
        let body = SignRequest {
            to_sign,
            pkp_public_key,
        };
        self.post_json(SIGN_ENDPOINT, Some(&body)).await
    }

    /// Hand the companion the credential it signs with; `POST /setAuthToken`.
    pub async fn set_auth_token(
        &self,
        auth_token: &RedactedSecret,
    ) -> Result<RpcResponse, ClientError> {
        debug!("Setting auth token ({} chars)", auth_token.len());
        let body = SetAuthTokenRequest {
            auth_token: auth_token.as_str(),
        };
        self.post_json(SET_AUTH_TOKEN_ENDPOINT, Some(&body)).await
    }

    /// The companion's stored PKP record; `GET /pkp`. JSON `null` means none stored.
    pub async fn get_pkp(&self) -> Result<Option<RpcResponse>, ClientError> {
        let url = self.base_url.join(PKP_ENDPOINT)?;
        match self.dispatch(PKP_ENDPOINT, self.http.get(url)).await? {
            Value::Null => Ok(None),
            other => into_object(PKP_ENDPOINT, other).map(Some),
        }
    }

    /// Stop the owned companion, if any, and report how that went.
    ///
    /// The stop runs on the blocking pool, so the runtime keeps serving other
    /// tasks during the shutdown grace period.
    pub async fn close(mut self) -> Result<(), SupervisorError> {
        match self.server.take() {
            Some(server) => stop_off_runtime(server).await,
            None => Ok(()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// True when this client started the companion and will stop it.
    pub fn owns_process(&self) -> bool {
        self.server.is_some()
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server.as_ref().and_then(CompanionServer::server_info)
    }

    // `post_json` and `dispatch` return plain futures so `#[track_caller]` applies:
    // a `Server` error records the operation that made the call.
    #[track_caller]
    fn post_json<B: Serialize>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> impl Future<Output = Result<RpcResponse, ClientError>> {
        let location = ErrorLocation::from(Location::caller());
        async move {
            let url = self.base_url.join(endpoint)?;
            let mut request = self.http.post(url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let reply = self.send(endpoint, request, location).await?;
            into_object(endpoint, reply)
        }
    }

    #[track_caller]
    fn dispatch(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> impl Future<Output = Result<Value, ClientError>> {
        self.send(endpoint, request, ErrorLocation::from(Location::caller()))
    }

    async fn send(
        &self,
        endpoint: &str,
        request: RequestBuilder,
        location: ErrorLocation,
    ) -> Result<Value, ClientError> {
        debug!("Calling companion endpoint /{endpoint}");

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let status_code = HttpStatusCode(status.as_u16());
            if status_code.is_server_error() {
                warn!("Companion endpoint /{endpoint} failed with HTTP {status_code}");
            } else {
                debug!("Companion endpoint /{endpoint} rejected the request with HTTP {status_code}");
            }
            return Err(ClientError::Server {
                status_code,
                message: format!("/{endpoint}: {}", String::from_utf8_lossy(&body)),
                location,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Run the blocking `stop()` on tokio's blocking pool.
async fn stop_off_runtime(mut server: CompanionServer) -> Result<(), SupervisorError> {
    spawn_blocking(move || server.stop())
        .await
        .map_err(|e| SupervisorError::shutdown("Companion stop task failed", IoError::other(e)))?
}

#[track_caller]
fn into_object(endpoint: &str, value: Value) -> Result<RpcResponse, ClientError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::json(format!(
            "/{endpoint} replied with {} where a JSON object was expected",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
