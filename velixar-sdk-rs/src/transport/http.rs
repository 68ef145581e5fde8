//! Async HTTP transport backed by `reqwest`

use super::{ApiRequest, RawResponse, Transport, default_headers, parse_retry_after};
use crate::config::ClientConfig;
use crate::errors::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// HTTP transport owning one lazily-created, pooled `reqwest::Client`
pub struct HttpTransport {
    config: ClientConfig,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpTransport {
    /// Create a transport; no connection is made until the first request
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    fn client(&self) -> Result<reqwest::Client, TransportError> {
        let mut guard = self.client.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        debug!("Creating HTTP client for {}", self.config.base_url);
        let client = reqwest::Client::builder()
            .default_headers(default_headers(&self.config)?)
            .user_agent(self.config.user_agent.as_str())
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;
        *guard = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = request.url(&self.config.base_url)?;
        let client = self.client()?;

        let mut builder = client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            retry_after,
            body: body.to_vec(),
        })
    }

    fn close(&self) {
        if self.client.lock().take().is_some() {
            debug!("Released HTTP client for {}", self.config.base_url);
        }
    }

    fn is_open(&self) -> bool {
        self.client.lock().is_some()
    }
}
