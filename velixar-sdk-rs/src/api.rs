//! Request construction and response decoding for the memory operations
//!
//! Shared by the async and blocking clients so both send identical requests
//! and interpret payloads identically.

use crate::errors::{Result, VelixarError};
use crate::transport::ApiRequest;
use crate::types::{
    BatchStoreResponse, Memory, SearchQuery, SearchResult, StoreRequest, StoreResponse,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const MEMORY: &str = "memory";

#[derive(Serialize)]
struct BatchBody<'a> {
    memories: &'a [StoreRequest],
}

#[derive(Deserialize)]
struct SearchPayload {
    #[serde(default)]
    memories: Vec<Memory>,
    #[serde(default)]
    count: usize,
}

/// `POST /memory`
pub(crate) fn store(request: &StoreRequest) -> Result<ApiRequest> {
    Ok(ApiRequest::new(Method::POST, [MEMORY]).body(serde_json::to_value(request)?))
}

/// `POST /memory/batch`
pub(crate) fn store_many(requests: &[StoreRequest]) -> Result<ApiRequest> {
    let body = serde_json::to_value(BatchBody { memories: requests })?;
    Ok(ApiRequest::new(Method::POST, [MEMORY, "batch"]).body(body))
}

/// `GET /memory/search`
pub(crate) fn search(query: &SearchQuery) -> ApiRequest {
    let mut request = ApiRequest::new(Method::GET, [MEMORY, "search"])
        .query("q", query.query.as_str())
        .query("limit", query.limit.to_string());

    if let Some(user_id) = query.user_id.as_deref().filter(|u| !u.is_empty()) {
        request = request.query("user_id", user_id);
    }
    if !query.tiers.is_empty() {
        let tiers = query
            .tiers
            .iter()
            .map(|t| t.as_u8().to_string())
            .collect::<Vec<_>>()
            .join(",");
        request = request.query("tiers", tiers);
    }
    request
}

/// `GET /memory/{id}`
pub(crate) fn get(memory_id: &str) -> Result<ApiRequest> {
    Ok(ApiRequest::new(Method::GET, [MEMORY, memory_segment(memory_id)?]))
}

/// `DELETE /memory/{id}`
pub(crate) fn delete(memory_id: &str) -> Result<ApiRequest> {
    Ok(ApiRequest::new(Method::DELETE, [MEMORY, memory_segment(memory_id)?]))
}

/// URL normalization drops `.` and `..` segments and an empty id names the
/// collection, so none of these can address a single memory.
fn memory_segment(memory_id: &str) -> Result<&str> {
    match memory_id {
        "" | "." | ".." => Err(VelixarError::validation(format!(
            "Invalid memory id: {memory_id:?}"
        ))),
        id => Ok(id),
    }
}

pub(crate) fn decode_store(payload: JsonValue) -> Result<String> {
    let response: StoreResponse = serde_json::from_value(payload)?;
    Ok(response.id)
}

pub(crate) fn decode_batch(payload: JsonValue) -> Result<BatchStoreResponse> {
    Ok(serde_json::from_value(payload)?)
}

pub(crate) fn decode_search(query: String, payload: JsonValue) -> Result<SearchResult> {
    let payload: SearchPayload = serde_json::from_value(payload)?;
    Ok(SearchResult {
        query,
        memories: payload.memories,
        count: payload.count,
    })
}

/// Accepts both a bare memory object and one wrapped as `{"memory": {...}}`.
pub(crate) fn decode_memory(mut payload: JsonValue) -> Result<Memory> {
    let wrapped = payload.get(MEMORY).is_some_and(JsonValue::is_object);
    let memory = if wrapped {
        payload[MEMORY].take()
    } else {
        payload
    };
    Ok(serde_json::from_value(memory)?)
}

pub(crate) fn decode_deleted(payload: &JsonValue) -> bool {
    payload
        .get("deleted")
        .and_then(JsonValue::as_bool)
        .unwrap_or(false)
}
