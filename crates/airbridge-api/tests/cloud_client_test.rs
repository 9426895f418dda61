#![allow(clippy::unwrap_used)]
// Integration tests for `CloudClient` using wiremock.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use airbridge_api::{AppCredentials, CloudClient, DeviceListing, Error, TokenManager};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let app = AppCredentials {
        app_key: "app-key".into(),
        app_secret: SecretString::from("app-secret".to_owned()),
    };
    let http = reqwest::Client::new();
    let tokens = Arc::new(TokenManager::with_client(http.clone(), &base, app).unwrap());
    let client = CloudClient::with_client(http, &base, tokens).unwrap();
    (server, client)
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 7200,
            "scope": "device_full_access",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_sends_bearer_and_timestamp() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/v1/apis/devices"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "devices": [{
                "info": { "mac": "582D34000001", "product": { "id": 1201 } },
                "data": { "co2": { "value": 612 } }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listing = client.list_devices().await.unwrap();
    let DeviceListing::Devices { total, devices } = listing else {
        panic!("expected a device list");
    };
    assert_eq!(total, Some(1));
    assert_eq!(devices[0].info.mac, "582D34000001");

    let requests = server.received_requests().await.unwrap();
    let listing_request = requests
        .iter()
        .find(|r| r.url.path() == "/v1/apis/devices")
        .unwrap();
    let timestamp = listing_request
        .url
        .query_pairs()
        .find(|(k, _)| k == "timestamp")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(timestamp.parse::<i64>().unwrap() > 1_600_000_000_000);
}

#[tokio::test]
async fn test_token_is_reused_across_listings() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/apis/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": [] })))
        .expect(2)
        .mount(&server)
        .await;

    client.list_devices().await.unwrap();
    client.list_devices().await.unwrap();
}

#[tokio::test]
async fn test_malformed_body_is_reported_not_raised() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/v1/apis/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": "later" })))
        .mount(&server)
        .await;

    let listing = client.list_devices().await.unwrap();
    assert!(matches!(listing, DeviceListing::Malformed { .. }));
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_invalidates_token() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/v1/apis/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    assert!(matches!(result, Err(Error::Unauthorized)), "got: {result:?}");
    assert!(client.tokens().current().is_none());
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let (server, client) = setup().await;
    mount_token(&server, "tok-1").await;

    Mock::given(method("GET"))
        .and(path("/v1/apis/devices"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    // The credential itself is still good.
    assert!(client.tokens().current().is_some());
}

#[tokio::test]
async fn test_auth_failure_skips_listing() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/apis/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "devices": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.list_devices().await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}
