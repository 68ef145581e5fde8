//! Integration tests for the blocking client
//!
//! The mock server runs on the test runtime; the blocking client runs on a
//! `spawn_blocking` thread so it never blocks the runtime driving the server.

use serde_json::json;
use std::time::Duration;
use velixar::blocking::Velixar;
use velixar::{ClientConfig, MemoryTier, StoreRequest, VelixarError};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .api_key("test-key")
        .base_url(format!("{}/v1", server.uri()))
        .backoff_base(Duration::from_millis(10))
        .build_with_env(|_| None)
        .unwrap()
}

#[tokio::test]
async fn test_blocking_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/memory"))
        .and(body_json(json!({"content": "Likes tea", "tier": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "mem-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/memory/mem-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memory": {"id": "mem-1", "content": "Likes tea", "tier": 1}
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/memory/mem-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .mount(&server)
        .await;

    let config = config_for(&server);
    tokio::task::spawn_blocking(move || {
        let client = Velixar::with_config(config);

        let id = client
            .store(StoreRequest::new("Likes tea").tier(MemoryTier::Session))
            .unwrap();
        let memory = client.get(&id).unwrap();
        assert_eq!(memory.tier, MemoryTier::Session);
        assert!(client.delete(&id).unwrap());
        assert!(client.is_connected());
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_blocking_rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/memory/search"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/memory/search"))
        .and(query_param("q", "tea"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memories": [{"id": "mem-1", "content": "Likes tea"}],
            "count": 1
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let context = tokio::task::spawn_blocking(move || {
        let client = Velixar::with_config(config);
        client.get_context("tea")
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(context, "Likes tea");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_blocking_insufficient_scope() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let err = tokio::task::spawn_blocking(move || Velixar::with_config(config).delete("mem-1"))
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, VelixarError::InsufficientScope { .. }));
}

#[test]
fn test_missing_api_key() {
    let result = ClientConfig::builder().build_with_env(|_| None);
    assert!(matches!(result, Err(VelixarError::Authentication { .. })));
}
