use crate::client::requests::{ExecuteJsRequest, SetAuthTokenRequest, SignRequest};

use serde_json::json;

/// **VALUE**: Pins the camelCase field names the companion reads.
///
/// **BUG THIS CATCHES**: Would catch a rename to `to_sign` / `pkp_public_key`, which the
/// companion would silently ignore and then fail to sign with an unrelated-looking error.
#[test]
fn given_sign_request_when_serialized_then_uses_companion_field_names() {
    // GIVEN: A sign request
    let request = SignRequest {
        to_sign: "0xadb2",
        pkp_public_key: "0x04ab",
    };

    // WHEN: Serializing
    let value = serde_json::to_value(&request).unwrap();

    // THEN: Exactly the two camelCase fields
    assert_eq!(value, json!({ "toSign": "0xadb2", "pkpPublicKey": "0x04ab" }));
}

#[test]
fn given_execute_request_without_params_when_serialized_then_omits_js_params() {
    let request = ExecuteJsRequest {
        code: "console.log(1)",
        js_params: None,
    };

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value, json!({ "code": "console.log(1)" }));
}

#[test]
fn given_execute_request_with_params_when_serialized_then_includes_js_params() {
    let params = json!({ "magicNumber": 42 });
    let request = ExecuteJsRequest {
        code: "go()",
        js_params: Some(&params),
    };

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["jsParams"]["magicNumber"], 42);
}

#[test]
fn given_auth_token_request_when_serialized_then_uses_auth_token_field() {
    let request = SetAuthTokenRequest { auth_token: "0xkey" };

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value, json!({ "authToken": "0xkey" }));
}
