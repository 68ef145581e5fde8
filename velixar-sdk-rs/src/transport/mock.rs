//! In-memory mock transport for testing
//!
//! Responses are scripted in order through a [`MockTransportHandle`]; every
//! request the client sends is recorded so tests can assert on the exact
//! method, path, query, and body.

use super::{ApiRequest, BlockingTransport, RawResponse, Transport};
use crate::errors::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Arc;

type Outcome = Result<RawResponse, TransportError>;

#[derive(Default)]
struct MockState {
    outcomes: VecDeque<Outcome>,
    requests: Vec<ApiRequest>,
    open: bool,
    connections: usize,
}

/// Handle for scripting and observing a [`MockTransport`]
#[derive(Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

/// A scripted transport implementing both [`Transport`] and [`BlockingTransport`]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport and a handle for tests
    pub fn pair() -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockTransportHandle { state },
        )
    }

    fn next(&self, request: &ApiRequest) -> Outcome {
        let mut state = self.state.lock();
        if !state.open {
            state.open = true;
            state.connections += 1;
        }
        state.requests.push(request.clone());
        state.outcomes.pop_front().unwrap_or_else(|| {
            Err(TransportError::Request(format!(
                "no scripted response for {} {}",
                request.method,
                request.path()
            )))
        })
    }

    fn release(&self) {
        self.state.lock().open = false;
    }
}

impl MockTransportHandle {
    /// Queue a raw response
    pub fn push_response(&self, response: RawResponse) {
        self.state.lock().outcomes.push_back(Ok(response));
    }

    /// Queue a 200 response with a JSON body
    pub fn push_json(&self, value: JsonValue) {
        self.push_response(RawResponse::json_ok(&value));
    }

    /// Queue an error status with a JSON body
    pub fn push_status(&self, status: u16, value: JsonValue) {
        self.push_response(RawResponse::new(status, value.to_string()));
    }

    /// Queue a transport failure
    pub fn push_failure(&self, error: TransportError) {
        self.state.lock().outcomes.push_back(Err(error));
    }

    /// All requests sent so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().requests.clone()
    }

    /// Most recent request, if any
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Number of requests sent so far
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of scripted outcomes not yet consumed
    pub fn pending(&self) -> usize {
        self.state.lock().outcomes.len()
    }

    /// Whether the transport currently holds a connection
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Number of times a connection was opened
    pub fn connections(&self) -> usize {
        self.state.lock().connections
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Outcome {
        self.next(request)
    }

    fn close(&self) {
        self.release();
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

impl BlockingTransport for MockTransport {
    fn send(&self, request: &ApiRequest) -> Outcome {
        self.next(request)
    }

    fn close(&self) {
        self.release();
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}
