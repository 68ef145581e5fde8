//! Transport layer abstractions
//!
//! This module defines the request and response shapes exchanged with the
//! Velixar API and the two transport traits: [`Transport`] for the async
//! client and [`BlockingTransport`] for the blocking one. The HTTP
//! implementations own the pooled connection; [`mock`] provides a scripted
//! in-memory transport for tests.

use crate::config::ClientConfig;
use crate::errors::{Result, TransportError};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value as JsonValue;

pub mod blocking;
pub mod http;
pub mod mock;

pub use blocking::BlockingHttpTransport;
pub use http::HttpTransport;

/// One API call, independent of how it is sent
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path segments below the base URL, unencoded
    pub segments: Vec<String>,
    /// Query parameters in order
    pub query: Vec<(&'static str, String)>,
    /// JSON body
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    /// Create a request for the given path segments
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter
    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Set the JSON body
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Path below the base URL, e.g. `/memory/search`
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Resolve the full URL against a base URL, percent-encoding segments
    pub fn url(&self, base_url: &str) -> std::result::Result<Url, TransportError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| TransportError::Request(format!("invalid base URL {base_url}: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| TransportError::Request(format!("base URL cannot be a base: {base_url}")))?
            .pop_if_empty()
            .extend(&self.segments);

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        Ok(url)
    }
}

/// Status, rate-limit hint, and body of one HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// `Retry-After` header in seconds, when present and numeric
    pub retry_after: Option<u64>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a response without a `Retry-After` hint
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Create a 200 response carrying a JSON value
    pub fn json_ok(value: &JsonValue) -> Self {
        Self::new(200, value.to_string())
    }

    /// Set the `Retry-After` hint
    pub fn with_retry_after(mut self, retry_after: Option<u64>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Decode the body as JSON; an empty body decodes to an empty object
    pub fn json(&self) -> Result<JsonValue> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonValue::Object(Default::default()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Transport used by the async client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError>;

    /// Release the pooled connection, if any
    fn close(&self);

    /// Whether a pooled connection is currently held
    fn is_open(&self) -> bool;
}

/// Transport used by the blocking client
pub trait BlockingTransport: Send + Sync {
    /// Send one request on the calling thread and return the raw response
    fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError>;

    /// Release the pooled connection, if any
    fn close(&self);

    /// Whether a pooled connection is currently held
    fn is_open(&self) -> bool;
}

/// Headers sent with every request
pub(crate) fn default_headers(
    config: &ClientConfig,
) -> std::result::Result<HeaderMap, TransportError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|_| TransportError::Request("API key contains invalid header characters".into()))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(headers)
}

/// Parse a `Retry-After` header given in seconds
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
