//! Error types for the Velixar SDK
//!
//! This module defines the typed error hierarchy returned by every client
//! operation, plus the classifier that maps a non-success HTTP response to
//! one of those errors.

use serde::Deserialize;
use thiserror::Error;

/// Main error type for the Velixar SDK
#[derive(Error, Debug)]
pub enum VelixarError {
    /// The API key is invalid, or no API key could be resolved
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Description of the failure
        message: String,
    },

    /// The API key lacks the scope required for the operation
    #[error("{message}")]
    InsufficientScope {
        /// Description of the failure
        message: String,
    },

    /// The referenced memory does not exist
    #[error("{message}")]
    NotFound {
        /// Description of the failure
        message: String,
    },

    /// The service rejected the request because of rate limiting
    #[error("Rate limit exceeded{}", retry_after_suffix(.retry_after))]
    RateLimit {
        /// Seconds to wait before retrying, when the service provided a hint
        retry_after: Option<u64>,
    },

    /// The service rejected the request parameters
    #[error("Invalid request: {message}")]
    Validation {
        /// Message extracted from the response body
        message: String,
    },

    /// Any other error status reported by the service
    #[error("{message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Description of the failure
        message: String,
    },

    /// The request never produced a response, even after retries
    #[error("Connection failed: {source}")]
    Connection {
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// A success response could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures raised by a transport before any HTTP status was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connect failure, timeout, or reset while talking to the service
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad URL, unencodable body)
    #[error("invalid request: {0}")]
    Request(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, VelixarError>;

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(" (retry after {seconds}s)"),
        None => String::new(),
    }
}

impl VelixarError {
    /// Create a new Authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap a transport failure
    pub fn connection(source: TransportError) -> Self {
        Self::Connection { source }
    }

    /// HTTP status associated with this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::InsufficientScope { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RateLimit { .. } => Some(429),
            Self::Validation { .. } => Some(400),
            Self::Api { status, .. } => Some(*status),
            Self::Connection { .. } | Self::Decode(_) => None,
        }
    }

    /// Check if the error is transient at the transport level
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit { .. } => true,
            Self::Connection { source } => source.is_transient(),
            _ => false,
        }
    }
}

impl TransportError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Request(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Map a non-success HTTP response to a typed error.
///
/// `retry_after` is the parsed `Retry-After` header in seconds; `body` is
/// the raw response body, only inspected for 400 responses.
///
/// Error statuses outside the table (409, 418, ...) become [`VelixarError::Api`]
/// instead of being returned as a payload, so no status ≥ 400 reaches a decoder.
pub fn classify(status: u16, retry_after: Option<u64>, body: &[u8]) -> VelixarError {
    match status {
        401 => VelixarError::authentication("Invalid or missing API key"),
        403 => VelixarError::InsufficientScope {
            message: "Insufficient scope for this operation".to_string(),
        },
        404 => VelixarError::NotFound {
            message: "Resource not found".to_string(),
        },
        429 => VelixarError::RateLimit { retry_after },
        400 => {
            let message = serde_json::from_slice::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "Invalid request".to_string());
            VelixarError::validation(message)
        },
        s if s >= 500 => VelixarError::Api {
            status: s,
            message: format!("Server error: {s}"),
        },
        s => VelixarError::Api {
            status: s,
            message: format!("Unexpected status: {s}"),
        },
    }
}
