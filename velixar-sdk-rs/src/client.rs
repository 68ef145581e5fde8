//! Async Velixar client
//!
//! Every operation is an independently awaitable future. Network calls and
//! backoff sleeps are yield points, so several operations on one client can
//! interleave on the same runtime. Wrap the client in an `Arc` to share it
//! between tasks.

use crate::api;
use crate::config::ClientConfig;
use crate::context;
use crate::errors::Result;
use crate::retry::{RetryPolicy, Step};
use crate::transport::{ApiRequest, HttpTransport, Transport};
use crate::types::{
    BatchStoreResponse, ContextQuery, Memory, SearchQuery, SearchResult, StoreRequest,
};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Async client for the Velixar memory API
///
/// The pooled HTTP connection is created on first use and released when the
/// client is dropped, or earlier through [`Velixar::close`].
///
/// # Example
///
/// ```rust,no_run
/// use velixar::{MemoryTier, Result, StoreRequest, Velixar};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = Velixar::new("vlx_your_key_here")?;
///
///     let id = client
///         .store(StoreRequest::new("User prefers dark mode").tier(MemoryTier::Pinned))
///         .await?;
///     println!("stored {id}");
///
///     let context = client.get_context("What does the user prefer?").await?;
///     println!("{context}");
///     Ok(())
/// }
/// ```
pub struct Velixar<T: Transport = HttpTransport> {
    config: ClientConfig,
    policy: RetryPolicy,
    transport: T,
}

impl Velixar<HttpTransport> {
    /// Create a client with an explicit API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::builder().api_key(api_key).build()?;
        Ok(Self::with_config(config))
    }

    /// Create a client configured from `VELIXAR_API_KEY` and `VELIXAR_BASE_URL`
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(ClientConfig::from_env()?))
    }

    /// Create a client from a resolved config
    pub fn with_config(config: ClientConfig) -> Self {
        let transport = HttpTransport::new(config.clone());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Velixar<T> {
    /// Create a client over a custom transport
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            policy: RetryPolicy::from_config(&config),
            config,
            transport,
        }
    }

    /// Resolved configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether the pooled connection is currently held
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Release the pooled connection.
    ///
    /// A later call creates a new one. Closing while other operations are
    /// in flight on this client is the caller's responsibility.
    pub fn close(&self) {
        self.transport.close();
    }

    /// Send one request, retrying transient failures, and return the
    /// decoded JSON payload
    pub async fn execute(&self, request: ApiRequest) -> Result<JsonValue> {
        let mut attempt = 0;
        loop {
            debug!(
                "{} {} (attempt {}/{})",
                request.method,
                request.path(),
                attempt + 1,
                self.policy.max_attempts
            );

            let outcome = self.transport.send(&request).await;
            match self.policy.evaluate(attempt, outcome) {
                Step::Finish(result) => return result,
                Step::Retry { delay, reason } => {
                    warn!(
                        "{} {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        request.method,
                        request.path(),
                        attempt + 1,
                        self.policy.max_attempts,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            }
        }
    }

    /// Store a memory and return its id
    pub async fn store(&self, request: impl Into<StoreRequest>) -> Result<String> {
        let request = api::store(&request.into())?;
        api::decode_store(self.execute(request).await?)
    }

    /// Store several memories in one request.
    ///
    /// Partial failure is reported through [`BatchStoreResponse::failed`],
    /// not as an error.
    pub async fn store_many<I>(&self, requests: I) -> Result<BatchStoreResponse>
    where
        I: IntoIterator,
        I::Item: Into<StoreRequest>,
    {
        let requests: Vec<StoreRequest> = requests.into_iter().map(Into::into).collect();
        let request = api::store_many(&requests)?;
        api::decode_batch(self.execute(request).await?)
    }

    /// Search memories by semantic similarity
    pub async fn search(&self, query: impl Into<SearchQuery>) -> Result<SearchResult> {
        let query = query.into();
        let payload = self.execute(api::search(&query)).await?;
        api::decode_search(query.query, payload)
    }

    /// Get one memory by id
    pub async fn get(&self, memory_id: &str) -> Result<Memory> {
        api::decode_memory(self.execute(api::get(memory_id)?).await?)
    }

    /// Delete one memory; returns the service's `deleted` flag
    pub async fn delete(&self, memory_id: &str) -> Result<bool> {
        let payload = self.execute(api::delete(memory_id)?).await?;
        Ok(api::decode_deleted(&payload))
    }

    /// Build a prompt context from the most relevant memories
    pub async fn get_context(&self, query: impl Into<ContextQuery>) -> Result<String> {
        let query = query.into();
        let result = self.search(context::search_for(&query)).await?;
        Ok(context::assemble(&result.memories, query.max_tokens))
    }
}

impl<T: Transport> Drop for Velixar<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{TransportError, VelixarError};
    use crate::transport::RawResponse;
    use crate::transport::mock::{MockTransport, MockTransportHandle};
    use crate::types::MemoryTier;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn client() -> (Velixar<MockTransport>, MockTransportHandle) {
        let config = ClientConfig::builder()
            .api_key("test-key")
            .build_with_env(|_| None)
            .unwrap();
        let (transport, handle) = MockTransport::pair();
        (Velixar::with_transport(config, transport), handle)
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(100),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    #[tokio::test]
    async fn test_store_places_tier_in_body() {
        let (client, handle) = client();
        for tier in [
            MemoryTier::Pinned,
            MemoryTier::Session,
            MemoryTier::Semantic,
            MemoryTier::Org,
        ] {
            handle.push_json(json!({"id": "mem-123"}));
            let id = client
                .store(StoreRequest::new("test content").tier(tier))
                .await
                .unwrap();
            assert_eq!(id, "mem-123");

            let body = handle.last_request().unwrap().body.unwrap();
            assert_eq!(body["tier"], json!(tier.as_u8()));
        }
    }

    #[tokio::test]
    async fn test_store_default_body() {
        let (client, handle) = client();
        handle.push_json(json!({"id": "mem-123"}));

        client.store("test content").await.unwrap();

        let request = handle.last_request().unwrap();
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(request.path(), "/memory");
        assert_eq!(request.body, Some(json!({"content": "test content", "tier": 2})));
    }

    #[tokio::test]
    async fn test_store_many_partial_failure() {
        let (client, handle) = client();
        handle.push_json(json!({"ids": ["a", "b"], "stored": 2, "failed": 1}));

        let response = client.store_many(["one", "two", "three"]).await.unwrap();

        assert_eq!(response.stored, 2);
        assert_eq!(response.failed, 1);
        assert_eq!(response.ids, vec!["a", "b"]);
        let body = handle.last_request().unwrap().body.unwrap();
        assert_eq!(body["memories"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_with_tiers() {
        let (client, handle) = client();
        handle.push_json(json!({
            "memories": [{"id": "mem-1", "content": "test memory", "score": 0.8}],
            "count": 1
        }));

        let result = client
            .search(SearchQuery::new("query").tiers([MemoryTier::Pinned, MemoryTier::Semantic]))
            .await
            .unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(result.memories[0].score, Some(0.8));
        let request = handle.last_request().unwrap();
        assert_eq!(request.query_value("tiers"), Some("0,2"));
        assert_eq!(request.query_value("q"), Some("query"));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let (client, handle) = client();
        handle.push_status(404, json!({"error": "not found"}));

        let err = client.get("missing").await.unwrap_err();
        assert!(matches!(err, VelixarError::NotFound { .. }));
        assert_eq!(handle.request_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_passes_flag_through() {
        let (client, handle) = client();
        handle.push_json(json!({"deleted": false}));

        assert!(!client.delete("mem-404").await.unwrap());
        assert_eq!(handle.last_request().unwrap().method, reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn test_dot_and_empty_ids_never_sent() {
        let (client, handle) = client();
        for id in ["", ".", ".."] {
            let err = client.delete(id).await.unwrap_err();
            assert!(matches!(err, VelixarError::Validation { .. }), "{id:?}: {err:?}");
            let err = client.get(id).await.unwrap_err();
            assert!(matches!(err, VelixarError::Validation { .. }), "{id:?}: {err:?}");
        }
        assert_eq!(handle.request_count(), 0);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_authentication_is_not_retried() {
        let (client, handle) = client();
        handle.push_status(401, json!({}));
        handle.push_json(json!({"id": "never"}));

        let err = client.store("test").await.unwrap_err();
        assert!(matches!(err, VelixarError::Authentication { .. }));
        assert_eq!(handle.request_count(), 1);
        assert_eq!(handle.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backoff_then_error() {
        let (client, handle) = client();
        for _ in 0..3 {
            handle.push_status(429, json!({}));
        }

        let start = Instant::now();
        let err = client.store("test").await.unwrap_err();

        assert!(matches!(err, VelixarError::RateLimit { retry_after: None }));
        assert_eq!(handle.request_count(), 3);
        // 1s after attempt 0, 2s after attempt 1, none after the last
        assert_elapsed(start, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honors_retry_after() {
        let (client, handle) = client();
        handle.push_response(RawResponse::new(429, "").with_retry_after(Some(5)));
        handle.push_json(json!({"id": "mem-1"}));

        let start = Instant::now();
        assert_eq!(client.store("test").await.unwrap(), "mem-1");
        assert_elapsed(start, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_recovers() {
        let (client, handle) = client();
        handle.push_failure(TransportError::Network("connection reset".into()));
        handle.push_json(json!({"deleted": true}));

        assert!(client.delete("mem-1").await.unwrap());
        assert_eq!(handle.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_exhausts_retries() {
        let (client, handle) = client();
        for _ in 0..3 {
            handle.push_failure(TransportError::Network("timed out".into()));
        }

        let err = client.get("mem-1").await.unwrap_err();
        match err {
            VelixarError::Connection { source } => assert!(source.to_string().contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(handle.request_count(), 3);
    }

    #[tokio::test]
    async fn test_get_context_budget() {
        let (client, handle) = client();
        let words = |n: usize| vec!["w"; n].join(" ");
        handle.push_json(json!({
            "memories": [
                {"id": "1", "content": words(10)},
                {"id": "2", "content": words(800)},
                {"id": "3", "content": words(10)}
            ],
            "count": 3
        }));

        let context = client
            .get_context(ContextQuery::new("prefs").user_id("user_123").max_tokens(1000))
            .await
            .unwrap();

        assert_eq!(context, words(10));
        let request = handle.last_request().unwrap();
        assert_eq!(request.query_value("limit"), Some("10"));
        assert_eq!(request.query_value("user_id"), Some("user_123"));
    }

    #[tokio::test]
    async fn test_close_and_reopen() {
        let (client, handle) = client();
        assert!(!client.is_connected());

        handle.push_json(json!({"deleted": true}));
        client.delete("a").await.unwrap();
        assert!(client.is_connected());

        client.close();
        assert!(!client.is_connected());

        handle.push_json(json!({"deleted": true}));
        client.delete("b").await.unwrap();
        assert_eq!(handle.connections(), 2);
    }

    #[tokio::test]
    async fn test_drop_releases_connection() {
        let (client, handle) = client();
        handle.push_json(json!({"deleted": true}));
        {
            let client = client;
            client.delete("a").await.unwrap();
        }

        assert!(!handle.is_open());
        assert_eq!(handle.connections(), 1);
    }
}
