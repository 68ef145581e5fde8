//! Blocking Velixar client
//!
//! Same operations as the async [`crate::Velixar`], performed on the calling
//! thread. Backoff sleeps block the thread. Do not use this client from
//! inside an async runtime; use the async client there.

use crate::api;
use crate::config::ClientConfig;
use crate::context;
use crate::errors::Result;
use crate::retry::{RetryPolicy, Step};
use crate::transport::{ApiRequest, BlockingHttpTransport, BlockingTransport};
use crate::types::{
    BatchStoreResponse, ContextQuery, Memory, SearchQuery, SearchResult, StoreRequest,
};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Blocking client for the Velixar memory API
///
/// # Panics
///
/// The underlying `reqwest::blocking::Client` panics when it is created or
/// dropped inside an async runtime. Creating the client is lazy, so the
/// panic surfaces on the first operation or on drop when either happens
/// from a tokio task. Use [`crate::Velixar`] there, or move the blocking
/// client onto a `spawn_blocking` thread.
///
/// ```rust,no_run
/// use velixar::blocking::Velixar;
///
/// # fn main() -> velixar::Result<()> {
/// {
///     let client = Velixar::new("vlx_your_key_here")?;
///     let results = client.search("programming preferences")?;
///     println!("found {} memories", results.count);
/// } // connection released here
/// # Ok(())
/// # }
/// ```
pub struct Velixar<T: BlockingTransport = BlockingHttpTransport> {
    config: ClientConfig,
    policy: RetryPolicy,
    transport: T,
}

impl Velixar<BlockingHttpTransport> {
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
        let transport = BlockingHttpTransport::new(config.clone());
        Self::with_transport(config, transport)
    }
}

impl<T: BlockingTransport> Velixar<T> {
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

    /// Release the pooled connection; a later call creates a new one
    pub fn close(&self) {
        self.transport.close();
    }

    /// Send one request, retrying transient failures, and return the
    /// decoded JSON payload
    pub fn execute(&self, request: ApiRequest) -> Result<JsonValue> {
        let mut attempt = 0;
        loop {
            debug!(
                "{} {} (attempt {}/{})",
                request.method,
                request.path(),
                attempt + 1,
                self.policy.max_attempts
            );

            let outcome = self.transport.send(&request);
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
                    std::thread::sleep(delay);
                    attempt += 1;
                },
            }
        }
    }

    /// Store a memory and return its id
    pub fn store(&self, request: impl Into<StoreRequest>) -> Result<String> {
        let request = api::store(&request.into())?;
        api::decode_store(self.execute(request)?)
    }

    /// Store several memories in one request
    pub fn store_many<I>(&self, requests: I) -> Result<BatchStoreResponse>
    where
        I: IntoIterator,
        I::Item: Into<StoreRequest>,
    {
        let requests: Vec<StoreRequest> = requests.into_iter().map(Into::into).collect();
        let request = api::store_many(&requests)?;
        api::decode_batch(self.execute(request)?)
    }

    /// Search memories by semantic similarity
    pub fn search(&self, query: impl Into<SearchQuery>) -> Result<SearchResult> {
        let query = query.into();
        let payload = self.execute(api::search(&query))?;
        api::decode_search(query.query, payload)
    }

    /// Get one memory by id
    pub fn get(&self, memory_id: &str) -> Result<Memory> {
        api::decode_memory(self.execute(api::get(memory_id)?)?)
    }

    /// Delete one memory; returns the service's `deleted` flag
    pub fn delete(&self, memory_id: &str) -> Result<bool> {
        let payload = self.execute(api::delete(memory_id)?)?;
        Ok(api::decode_deleted(&payload))
    }

    /// Build a prompt context from the most relevant memories
    pub fn get_context(&self, query: impl Into<ContextQuery>) -> Result<String> {
        let query = query.into();
        let result = self.search(context::search_for(&query))?;
        Ok(context::assemble(&result.memories, query.max_tokens))
    }
}

impl<T: BlockingTransport> Drop for Velixar<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
