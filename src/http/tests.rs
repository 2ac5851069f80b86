//! Tests for the HTTP module

use super::*;
use crate::config::TapConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> TapConfig {
    TapConfig::from_json(&format!(
        r#"{{"access_token": "secret-token", "base_url": "{}", "max_retries": 3}}"#,
        server.uri()
    ))
    .unwrap()
}

#[tokio::test]
async fn test_call_posts_token_in_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users.list"))
        .and(body_partial_json(json!({"token": "secret-token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "users": [{"id": "u1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config_for(&server)).unwrap();
    let body = client.call("users.list", serde_json::Map::new()).await.unwrap();

    assert_eq!(body["users"][0]["id"], "u1");
}

#[tokio::test]
async fn test_call_merges_extra_body_params() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/responses.list"))
        .and(body_partial_json(json!({
            "token": "secret-token",
            "form_id": 12,
            "page": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "responses": []
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&config_for(&server)).unwrap();
    let mut body = serde_json::Map::new();
    body.insert("form_id".to_string(), json!(12));
    body.insert("page".to_string(), json!(2));

    let response = client.call("responses.list", body).await.unwrap();
    assert_eq!(response["ok"], true);
}

#[tokio::test]
async fn test_transient_500_is_retried_to_success() {
    let server = MockServer::start().await;

    // First attempt fails, later attempts succeed.
    Mock::given(method("POST"))
        .and(path("/roles.list"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/roles.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "roles": [{"id": "r1", "name": "Admin"}]
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&config_for(&server)).unwrap();
    let body = client.call("roles.list", serde_json::Map::new()).await.unwrap();

    assert_eq!(body["roles"][0]["name"], "Admin");
}

#[tokio::test]
async fn test_persistent_500_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/roles.list"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(3)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config_for(&server)).unwrap();
    let err = client
        .call("roles.list", serde_json::Map::new())
        .await
        .unwrap_err();

    assert!(matches!(err, crate::error::Error::RetriesExhausted { .. }));
}

#[tokio::test]
async fn test_auth_failure_is_fatal_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users.list"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config_for(&server)).unwrap();
    let err = client
        .call("users.list", serde_json::Map::new())
        .await
        .unwrap_err();

    match err {
        crate::error::Error::FatalFetch { status, .. } => assert_eq!(status, Some(401)),
        other => panic!("expected FatalFetch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ok_false_body_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/forms.list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "error": "insufficient_permissions"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&config_for(&server)).unwrap();
    let err = client
        .call("forms.list", serde_json::Map::new())
        .await
        .unwrap_err();

    match err {
        crate::error::Error::FatalFetch { message, .. } => {
            assert!(message.contains("insufficient_permissions"));
        }
        other => panic!("expected FatalFetch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_endpoint_url_building() {
    let config = TapConfig::from_json(
        r#"{"access_token": "t", "base_url": "https://api.kpaehs.com/v1/"}"#,
    )
    .unwrap();
    let client = ApiClient::new(&config).unwrap();

    assert_eq!(
        client.endpoint_url("users.list"),
        "https://api.kpaehs.com/v1/users.list"
    );
    assert_eq!(
        client.endpoint_url("/users.list"),
        "https://api.kpaehs.com/v1/users.list"
    );
}

#[tokio::test]
async fn test_invalid_base_url_rejected() {
    let config =
        TapConfig::from_json(r#"{"access_token": "t", "base_url": "not a url"}"#).unwrap();
    assert!(ApiClient::new(&config).is_err());
}
