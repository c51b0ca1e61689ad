//! HTTP provider client against a mock endpoint.

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::json;
use strato_id::OwnerScope;
use strato_registry::providers::{HttpProvider, ProviderError, ResourceProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer, timeout: Duration) -> HttpProvider {
    HttpProvider::new(reqwest::Client::new(), server.uri(), timeout)
}

#[tokio::test]
async fn list_ids_sends_scope_and_collects_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ids"))
        .and(query_param("user", "alice"))
        .and(query_param("project", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["i1", "i2", "i1"])))
        .mount(&server)
        .await;

    let ids = provider(&server, Duration::from_secs(5))
        .list_ids(&OwnerScope::owned("alice", "p1"))
        .await
        .unwrap();

    assert_eq!(ids, BTreeSet::from(["i1".to_string(), "i2".to_string()]));
}

#[tokio::test]
async fn shared_scope_sends_no_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["pub-1"])))
        .mount(&server)
        .await;

    let ids = provider(&server, Duration::from_secs(5))
        .list_ids(&OwnerScope::Shared)
        .await
        .unwrap();

    assert_eq!(ids, BTreeSet::from(["pub-1".to_string()]));
}

#[tokio::test]
async fn get_returns_raw_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"hostname": "web-1", "state": "active"})),
        )
        .mount(&server)
        .await;

    let object = provider(&server, Duration::from_secs(5))
        .get(&OwnerScope::owned("alice", "p1"), "i1")
        .await
        .unwrap();

    assert_eq!(object["hostname"], "web-1");
}

#[tokio::test]
async fn missing_object_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_secs(5))
        .get(&OwnerScope::Shared, "ghost")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn missing_listing_endpoint_is_unavailable_not_an_object_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ids"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_secs(5))
        .list_ids(&OwnerScope::Shared)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Unavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn forbidden_is_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ids"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_secs(5))
        .list_ids(&OwnerScope::Shared)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Denied(_)), "got {err:?}");
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ids"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_secs(5))
        .list_ids(&OwnerScope::Shared)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Unavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ids"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_millis(100))
        .list_ids(&OwnerScope::Shared)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Timeout), "got {err:?}");
}
