//! Request bodies sent to the companion. Field names follow its wire format.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct ExecuteJsRequest<'a> {
    pub code: &'a str,
    #[serde(rename = "jsParams", skip_serializing_if = "Option::is_none")]
    pub js_params: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignRequest<'a> {
    #[serde(rename = "toSign")]
    pub to_sign: &'a str,
    #[serde(rename = "pkpPublicKey")]
    pub pkp_public_key: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SetAuthTokenRequest<'a> {
    #[serde(rename = "authToken")]
    pub auth_token: &'a str,
}
