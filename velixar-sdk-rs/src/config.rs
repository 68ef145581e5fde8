//! Client configuration
//!
//! Resolves the API key and base URL from explicit builder values or the
//! process environment, and carries the instance-wide timeout and retry
//! settings shared by both client variants.

use crate::errors::{Result, VelixarError};
use std::time::Duration;

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.velixarai.com/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "VELIXAR_API_KEY";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "VELIXAR_BASE_URL";

/// Resolved configuration for a client
#[derive(Clone)]
pub struct ClientConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Base URL without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum attempts per request (at least 1)
    pub max_retries: u32,
    /// Unit of exponential backoff; the delay before retry `n` is `backoff_base * 2^n`
    pub backoff_base: Duration,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolve a config from the environment only
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    backoff_base: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    /// Set the API key explicitly
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL explicitly
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum attempts per request
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the backoff unit
    pub fn backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = Some(backoff_base);
        self
    }

    /// Override the `User-Agent` header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Resolve against the process environment
    pub fn build(self) -> Result<ClientConfig> {
        self.build_with_env(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup
    pub fn build_with_env<F>(self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let api_key = non_empty(self.api_key)
            .or_else(|| non_empty(lookup(API_KEY_ENV)))
            .ok_or_else(|| {
                VelixarError::authentication(format!(
                    "API key required. Set {API_KEY_ENV} or pass api_key"
                ))
            })?;

        let base_url = non_empty(self.base_url)
            .or_else(|| non_empty(lookup(BASE_URL_ENV)))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(ClientConfig {
            api_key,
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
            backoff_base: self.backoff_base.unwrap_or(Duration::from_secs(1)),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| format!("velixar-rust/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}
