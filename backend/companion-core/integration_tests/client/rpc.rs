// Pass-through behavior of the RPC operations against a mock companion.

use crate::helpers::{fast_config, free_port, ready_companion};

use companion_core::CompanionClient;
use companion_core::error::ClientError;

use common::RedactedSecret;

use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn attached(server: &MockServer) -> CompanionClient {
    CompanionClient::attach(&server.uri(), &fast_config(free_port()))
        .await
        .expect("mock companion reports ready")
}

// ----------------------------------------------------------------------------
// execute_js
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies that `execute_js` posts `{"code"}` and returns the reply untouched.
///
/// **WHY THIS MATTERS**: Callers read `response` and `logs` straight out of the map.
/// Any reshaping on the way through would change what scripts appear to return.
///
/// **BUG THIS CATCHES**: Would catch a renamed body field or a client-side filter of the reply.
#[tokio::test]
async fn given_ready_companion_when_execute_js_then_returns_reply_verbatim() {
    // GIVEN: A companion that answers the hello-world script
    let server = ready_companion().await;
    let code = r#"console.log("This is a log"); Lit.Actions.setResponse({response: "Hello, World!"});"#;
    let reply = json!({
        "success": true,
        "response": "Hello, World!",
        "logs": "This is a log\n",
    });
    Mock::given(method("POST"))
        .and(path("/executeJs"))
        .and(body_json(json!({ "code": code })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&server)
        .await;
    let client = attached(&server).await;

    // WHEN: Executing the script
    let result = client.execute_js(code).await.unwrap();

    // THEN: Exactly what the companion sent
    assert_eq!(Value::Object(result), reply);
}

#[tokio::test]
async fn given_js_params_when_execute_js_with_params_then_sends_js_params() {
    let server = ready_companion().await;
    let params = json!({ "publicKey": "0x04ab", "sigName": "sig1" });
    Mock::given(method("POST"))
        .and(path("/executeJs"))
        .and(body_json(json!({ "code": "go()", "jsParams": params })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    let client = attached(&server).await;

    let result = client
        .execute_js_with_params("go()", Some(&params))
        .await
        .unwrap();

    assert_eq!(result.get("success"), Some(&json!(true)));
}

/// **VALUE**: Verifies that a domain failure (`"success": false`) is data, not an error.
///
/// **BUG THIS CATCHES**: Would catch the client inspecting reply content and turning
/// script errors into `Err`, hiding the companion's own error message from callers.
#[tokio::test]
async fn given_script_failure_reply_when_execute_js_then_returns_ok() {
    // GIVEN: A companion reporting a script error with HTTP 200
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/executeJs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "ReferenceError: x" })),
        )
        .mount(&server)
        .await;
    let client = attached(&server).await;

    // WHEN: Executing
    let result = client.execute_js("x").await;

    // THEN: Ok, failure visible in the payload
    let reply = result.expect("domain failures are not transport errors");
    assert_eq!(reply.get("success"), Some(&json!(false)));
    assert_eq!(reply.get("error"), Some(&json!("ReferenceError: x")));
}

// ----------------------------------------------------------------------------
// create_wallet / sign
// ----------------------------------------------------------------------------

#[tokio::test]
async fn given_ready_companion_when_create_wallet_then_posts_empty_body() {
    // GIVEN: A companion that mints a wallet for an empty POST
    let server = ready_companion().await;
    let reply = json!({
        "pkp": {
            "tokenId": "0x1",
            "publicKey": "0x04deadbeef",
            "ethAddress": "0xabc",
        },
        "tx": "0xfeed",
    });
    Mock::given(method("POST"))
        .and(path("/createWallet"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
        .expect(1)
        .mount(&server)
        .await;
    let client = attached(&server).await;

    // WHEN: Creating a wallet
    let result = client.create_wallet().await.unwrap();

    // THEN: Nested fields reachable unchanged
    assert_eq!(result["pkp"]["publicKey"], json!("0x04deadbeef"));
    assert_eq!(Value::Object(result), reply);
}

/// **VALUE**: Verifies the exact camelCase wire names of the sign request.
///
/// **WHY THIS MATTERS**: The companion reads `toSign` and `pkpPublicKey` by name. A
/// snake_case body is accepted by HTTP and then fails inside the companion with an
/// unhelpful signing error.
#[tokio::test]
async fn given_ready_companion_when_sign_then_posts_camel_case_body() {
    // GIVEN: A companion matching the exact sign body
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .and(body_json(json!({
            "toSign": "0x68656c6c6f",
            "pkpPublicKey": "0x04deadbeef",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "signature": "0xsig", "recid": 1 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = attached(&server).await;

    // WHEN: Signing
    let result = client.sign("0x68656c6c6f", "0x04deadbeef").await.unwrap();

    // THEN: Signature passed through
    assert_eq!(result.get("signature"), Some(&json!("0xsig")));
    assert_eq!(result.get("recid"), Some(&json!(1)));
}

// ----------------------------------------------------------------------------
// set_auth_token / get_pkp
// ----------------------------------------------------------------------------

#[tokio::test]
async fn given_auth_token_when_set_auth_token_then_posts_token() {
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/setAuthToken"))
        .and(body_json(json!({ "authToken": "s3cr3t" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    let client = attached(&server).await;

    let result = client
        .set_auth_token(&RedactedSecret::new("s3cr3t"))
        .await
        .unwrap();

    assert_eq!(result.get("success"), Some(&json!(true)));
}

#[tokio::test]
async fn given_no_stored_pkp_when_get_pkp_then_returns_none() {
    let server = ready_companion().await;
    Mock::given(method("GET"))
        .and(path("/pkp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
        .mount(&server)
        .await;
    let client = attached(&server).await;

    let result = client.get_pkp().await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn given_stored_pkp_when_get_pkp_then_returns_record() {
    let server = ready_companion().await;
    Mock::given(method("GET"))
        .and(path("/pkp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "publicKey": "0x04deadbeef" })),
        )
        .mount(&server)
        .await;
    let client = attached(&server).await;

    let result = client.get_pkp().await.unwrap();

    let pkp = result.expect("stored pkp");
    assert_eq!(pkp.get("publicKey"), Some(&json!("0x04deadbeef")));
}

// ----------------------------------------------------------------------------
// Transport failures
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies that non-2xx replies surface as `ClientError::Server` with the status.
///
/// **BUG THIS CATCHES**: Would catch error bodies being parsed as a successful reply,
/// which would hand callers an object with no indication the call failed.
#[tokio::test]
async fn given_server_error_when_calling_rpc_then_returns_server_error() {
    // GIVEN: A companion that crashes on /sign
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal boom"))
        .mount(&server)
        .await;
    let client = attached(&server).await;

    // WHEN: Signing
    let result = client.sign("0x00", "0x04").await;

    // THEN: Server error with status and body
    let err = result.unwrap_err();
    assert_eq!(err.status_code().map(|s| s.0), Some(500));
    match err {
        ClientError::Server { message, .. } => assert!(message.contains("internal boom")),
        other => panic!("Expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn given_malformed_reply_when_calling_rpc_then_returns_json_error() {
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/createWallet"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;
    let client = attached(&server).await;

    let result = client.create_wallet().await;

    assert!(matches!(result, Err(ClientError::Json { .. })), "got {result:?}");
}

#[tokio::test]
async fn given_non_object_reply_when_calling_rpc_then_returns_json_error() {
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/executeJs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;
    let client = attached(&server).await;

    let result = client.execute_js("1").await;

    match result {
        Err(ClientError::Json { message, .. }) => assert!(message.contains("an array")),
        other => panic!("Expected Json error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a companion that went away yields an HTTP error, unretried.
///
/// **WHY THIS MATTERS**: Callers need to tell "companion died" apart from
/// "companion said no" and decide whether to restart it.
#[tokio::test]
async fn given_companion_gone_when_calling_rpc_then_returns_connect_error() {
    // GIVEN: A client attached to a companion that then shuts down
    let server = ready_companion().await;
    let client = attached(&server).await;
    drop(server);

    // WHEN: Calling
    let result = client.execute_js("1").await;

    // THEN: Transport error, no HTTP status
    let err = result.unwrap_err();
    assert!(matches!(err, ClientError::Http { .. }), "got {err:?}");
    assert_eq!(err.status_code(), None);
}

/// **VALUE**: Verifies that a server error records which operation made the call.
///
/// **BUG THIS CATCHES**: Would catch the location being captured inside the shared request
/// helper again, which made every `Server` error point at the same line.
#[tokio::test]
async fn given_server_errors_from_different_operations_when_inspected_then_locations_differ() {
    // GIVEN: A companion failing every call with 500
    let server = ready_companion().await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/createWallet"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let client = attached(&server).await;

    // WHEN: Two different operations fail
    let sign_err = client.sign("0x00", "0x04").await.unwrap_err();
    let wallet_err = client.create_wallet().await.unwrap_err();

    // THEN: Each error carries its own call site
    match (sign_err, wallet_err) {
        (
            ClientError::Server {
                location: sign_location,
                ..
            },
            ClientError::Server {
                location: wallet_location,
                ..
            },
        ) => {
            assert_ne!(sign_location, wallet_location);
            assert!(sign_location.to_string().contains("mod.rs"), "{sign_location}");
        }
        other => panic!("Expected two Server errors, got {other:?}"),
    }
}
