use std::time::Duration;

use cloud_keys::error::ErrorKind;
use cloud_keys::providers::gcp::{GcpHttpClient, GcpKeys};
use cloud_keys::util::http::HttpClient;
use cloud_keys::{KeyProvider, KeyStatus, KeysError};
use httpmock::prelude::*;
use serde_json::json;

const TOKEN: &str = "ya29.test-token";
const SA_ACTIVE: &str = "builder@proj.iam.gserviceaccount.com";
const SA_DISABLED: &str = "legacy@proj.iam.gserviceaccount.com";

fn adapter(server: &MockServer) -> GcpKeys {
    let http = HttpClient::new(Duration::from_secs(5)).unwrap();
    GcpKeys::new(GcpHttpClient::new(http, &server.base_url()))
}

fn key_json(account: &str, id: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/proj/serviceAccounts/{}/keys/{}", account, id),
        "validAfterTime": "2021-04-01T08:00:00Z",
        "validBeforeTime": "9999-12-31T23:59:59Z",
        "keyAlgorithm": "KEY_ALG_RSA_2048",
        "keyOrigin": "GOOGLE_PROVIDED",
        "keyType": "USER_MANAGED"
    })
}

fn mock_inventory(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/v1/projects/proj/serviceAccounts")
            .header("Authorization", format!("Bearer {}", TOKEN));
        then.status(200).json_body(json!({
            "accounts": [
                { "email": SA_ACTIVE, "name": "projects/proj/serviceAccounts/builder" },
                { "email": SA_DISABLED, "disabled": true }
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v1/projects/proj/serviceAccounts/{}/keys", SA_ACTIVE))
            .query_param("keyTypes", "USER_MANAGED");
        then.status(200)
            .json_body(json!({ "keys": [key_json(SA_ACTIVE, "0123456789abcdef0123")] }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v1/projects/proj/serviceAccounts/{}/keys", SA_DISABLED));
        then.status(200)
            .json_body(json!({ "keys": [key_json(SA_DISABLED, "fedcba9876543210fedc")] }));
    });
}

#[test]
fn test_list_keys_skips_disabled_accounts() {
    let server = MockServer::start();
    mock_inventory(&server);

    let keys = adapter(&server).keys("proj", false, TOKEN).unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];
    assert_eq!(key.account, "builder");
    assert_eq!(key.full_account, SA_ACTIVE);
    assert_eq!(key.id, "0123456789abcdef0123");
    assert_eq!(key.name, "builder_ef0123");
    assert_eq!(key.status, KeyStatus::Active);
    assert_eq!(key.provider.scope, "proj");
    assert!(key.life_remaining > 0.0);
}

#[test]
fn test_list_keys_include_inactive() {
    let server = MockServer::start();
    mock_inventory(&server);

    let keys = adapter(&server).keys("proj", true, TOKEN).unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[1].account, "legacy");
    assert_eq!(keys[1].status, KeyStatus::Inactive);
}

#[test]
fn test_list_keys_requires_project() {
    let server = MockServer::start();
    let err = adapter(&server).keys("", false, TOKEN).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_list_keys_requires_token() {
    let server = MockServer::start();
    let err = adapter(&server).keys("proj", false, "").unwrap_err();
    assert!(matches!(err, KeysError::Configuration(_)));
}

#[test]
fn test_create_key() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v1/projects/proj/serviceAccounts/{}/keys", SA_ACTIVE));
        then.status(200).json_body(json!({ "keys": [] }));
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/v1/projects/proj/serviceAccounts/{}/keys", SA_ACTIVE))
            .header("Authorization", format!("Bearer {}", TOKEN));
        then.status(200).json_body(json!({
            "name": format!("projects/proj/serviceAccounts/{}/keys/newkey0001", SA_ACTIVE),
            "privateKeyData": "eyJ0eXBlIjoic2VydmljZV9hY2NvdW50In0="
        }));
    });

    let created = adapter(&server).create_key("proj", SA_ACTIVE, TOKEN).unwrap();
    create.assert();
    assert_eq!(created.id, "newkey0001");
    assert_eq!(created.secret.as_str(), "eyJ0eXBlIjoic2VydmljZV9hY2NvdW50In0=");
}

#[test]
fn test_delete_key() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("/v1/projects/proj/serviceAccounts/{}/keys/0123456789abcdef0123", SA_ACTIVE));
        then.status(200).json_body(json!({}));
    });

    adapter(&server)
        .delete_key("proj", SA_ACTIVE, "0123456789abcdef0123", TOKEN)
        .unwrap();
    delete.assert();
}

#[test]
fn test_error_envelope() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/projects/proj/serviceAccounts");
        then.status(403).json_body(json!({
            "error": {
                "code": 403,
                "message": "Permission 'iam.serviceAccounts.list' denied",
                "status": "PERMISSION_DENIED"
            }
        }));
    });

    let err = adapter(&server).keys("proj", false, TOKEN).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderApi);
    assert_eq!(
        err.to_string(),
        "gcp api error: 403 PERMISSION_DENIED: Permission 'iam.serviceAccounts.list' denied"
    );
}

#[test]
fn test_malformed_timestamp_fails_whole_call() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1/projects/proj/serviceAccounts");
        then.status(200).json_body(json!({ "accounts": [{ "email": SA_ACTIVE }] }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v1/projects/proj/serviceAccounts/{}/keys", SA_ACTIVE));
        then.status(200).json_body(json!({
            "keys": [{
                "name": format!("projects/proj/serviceAccounts/{}/keys/abc", SA_ACTIVE),
                "validAfterTime": "yesterday",
                "validBeforeTime": "9999-12-31T23:59:59Z"
            }]
        }));
    });

    let err = adapter(&server).keys("proj", false, TOKEN).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Normalization);
}
