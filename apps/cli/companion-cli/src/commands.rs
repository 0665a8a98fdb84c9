//! Command execution: build the config, connect, make one call, close.

use crate::cli::{Cli, Command};
use crate::error::CliError;

use common::RedactedSecret;

use companion_core::error::SupervisorError;
use companion_core::{CompanionClient, CompanionConfig};

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde_json::{Map, Value, json};

/// Environment variable `set-auth-token` reads the token from.
pub const AUTH_TOKEN_ENV_VAR: &str = "COMPANION_AUTH_TOKEN";

/// Where the script for `exec` comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSource {
    Inline(String),
    File(PathBuf),
}

impl CodeSource {
    pub fn from_args(code: Option<String>, file: Option<PathBuf>) -> Result<Self, CliError> {
        match (code, file) {
            (Some(code), None) => Ok(CodeSource::Inline(code)),
            (None, Some(file)) => Ok(CodeSource::File(file)),
            _ => Err(CliError::cli("exactly one of --code or --file is required")),
        }
    }

    pub fn read(&self) -> Result<String, CliError> {
        match self {
            CodeSource::Inline(code) => Ok(code.clone()),
            CodeSource::File(path) => read_to_string(path).map_err(|e| {
                CliError::cli(format!("Failed to read code from {}: {e}", path.display()))
            }),
        }
    }
}

/// Config file (or defaults), then `COMPANION_*` environment, then `--port`.
pub fn resolve_config(
    config_path: Option<&Path>,
    port: Option<u16>,
) -> Result<CompanionConfig, CliError> {
    let mut config = CompanionConfig::load_with_env(config_path)?;
    if let Some(port) = port {
        config.port = port;
        config.validate()?;
    }
    Ok(config)
}

/// Parse `--params` into the JSON object handed to the script.
pub fn parse_params(raw: Option<&str>) -> Result<Option<Value>, CliError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(Some(value)),
        Ok(_) => Err(CliError::cli("--params must be a JSON object")),
        Err(e) => Err(CliError::cli(format!("--params is not valid JSON: {e}"))),
    }
}

/// Read the auth token from an arbitrary lookup; blank counts as unset.
pub fn auth_token_from<F>(lookup: F) -> Result<RedactedSecret, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(AUTH_TOKEN_ENV_VAR) {
        Some(token) if !token.trim().is_empty() => Ok(RedactedSecret::new(token)),
        _ => Err(CliError::cli(format!("{AUTH_TOKEN_ENV_VAR} is not set"))),
    }
}

/// Run one command against a connected companion and return what to print.
pub async fn run(cli: Cli) -> Result<Value, CliError> {
    let config = resolve_config(cli.config.as_deref(), cli.port)?;

    // Validate local input before paying for a companion start.
    let call = prepare(cli.command)?;

    info!("Connecting to companion on port {}", config.port);
    let client = CompanionClient::connect(config).await?;
    debug!(
        "Connected to {} (owns process: {})",
        client.base_url(),
        client.owns_process()
    );

    let outcome = call.execute(&client).await;
    settle(outcome, client.close().await)
}

/// Combine the call's result with the teardown's. The call's error wins; a
/// teardown failure after a successful call is still an error.
pub fn settle(
    outcome: Result<Value, CliError>,
    closed: Result<(), SupervisorError>,
) -> Result<Value, CliError> {
    match (outcome, closed) {
        (outcome, Ok(())) => outcome,
        (Err(call_err), Err(close_err)) => {
            error!("Failed to stop companion: {close_err}");
            Err(call_err)
        }
        (Ok(_), Err(close_err)) => Err(close_err.into()),
    }
}

/// A command with its local input already read and checked.
enum PreparedCall {
    Exec { code: String, params: Option<Value> },
    CreateWallet,
    Sign { to_sign: String, pkp_public_key: String },
    Pkp,
    SetAuthToken(RedactedSecret),
    Ready,
}

fn prepare(command: Command) -> Result<PreparedCall, CliError> {
    Ok(match command {
        Command::Exec { code, file, params } => PreparedCall::Exec {
            code: CodeSource::from_args(code, file)?.read()?,
            params: parse_params(params.as_deref())?,
        },
        Command::CreateWallet => PreparedCall::CreateWallet,
        Command::Sign {
            to_sign,
            pkp_public_key,
        } => PreparedCall::Sign {
            to_sign,
            pkp_public_key,
        },
        Command::Pkp => PreparedCall::Pkp,
        Command::SetAuthToken => {
            PreparedCall::SetAuthToken(auth_token_from(|key| std::env::var(key).ok())?)
        }
        Command::Ready => PreparedCall::Ready,
    })
}

impl PreparedCall {
    async fn execute(self, client: &CompanionClient) -> Result<Value, CliError> {
        let reply = match self {
            PreparedCall::Exec { code, params } => {
                client.execute_js_with_params(&code, params.as_ref()).await?
            }
            PreparedCall::CreateWallet => client.create_wallet().await?,
            PreparedCall::Sign {
                to_sign,
                pkp_public_key,
            } => client.sign(&to_sign, &pkp_public_key).await?,
            PreparedCall::Pkp => {
                return Ok(client.get_pkp().await?.map_or(Value::Null, Value::Object));
            }
            PreparedCall::SetAuthToken(token) => client.set_auth_token(&token).await?,
            PreparedCall::Ready => return Ok(ready_report(client)),
        };
        Ok(Value::Object(reply))
    }
}

fn ready_report(client: &CompanionClient) -> Value {
    let mut report = Map::new();
    report.insert("ready".to_string(), json!(true));
    report.insert("baseUrl".to_string(), json!(client.base_url().as_str()));
    report.insert("ownsProcess".to_string(), json!(client.owns_process()));
    if let Some(info) = client.server_info() {
        report.insert("pid".to_string(), json!(info.pid));
        report.insert("command".to_string(), json!(info.command));
    }
    Value::Object(report)
}
