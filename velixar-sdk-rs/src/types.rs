//! Type definitions for the Velixar SDK
//!
//! Memories, tiers, and the request/response shapes exchanged with the
//! Velixar API. All of these are plain DTOs built per call; nothing here is
//! held across requests.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Storage tier of a memory.
///
/// The integer values are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum MemoryTier {
    /// Critical facts, never expire
    Pinned = 0,
    /// Current session context
    Session = 1,
    /// Long-term semantic memories
    #[default]
    Semantic = 2,
    /// Organization-wide knowledge
    Org = 3,
}

impl MemoryTier {
    /// Wire value of the tier
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<MemoryTier> for u8 {
    fn from(tier: MemoryTier) -> Self {
        tier.as_u8()
    }
}

impl TryFrom<u8> for MemoryTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pinned),
            1 => Ok(Self::Session),
            2 => Ok(Self::Semantic),
            3 => Ok(Self::Org),
            other => Err(format!("unknown memory tier: {other}")),
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pinned => "pinned",
            Self::Session => "session",
            Self::Semantic => "semantic",
            Self::Org => "org",
        };
        f.write_str(name)
    }
}

/// A stored memory, as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Server-assigned identifier
    pub id: String,
    /// Memory text
    pub content: String,
    /// Storage tier
    #[serde(default)]
    pub tier: MemoryTier,
    /// Owning user, if any
    #[serde(default)]
    pub user_id: Option<String>,
    /// Tags in server order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Opaque metadata
    #[serde(default)]
    pub metadata: Map<String, JsonValue>,
    /// Relevance score, only present on search results
    #[serde(default)]
    pub score: Option<f64>,
    /// Creation time.
    ///
    /// Accepts RFC 3339, naive ISO 8601 (read as UTC), and epoch seconds.
    /// Anything else decodes as `None`.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(text) => parse_timestamp_str(text.trim()),
        JsonValue::Number(number) => match number.as_i64() {
            Some(secs) => DateTime::from_timestamp(secs, 0),
            None => {
                let secs = number.as_f64()?;
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
            },
        },
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Result of a semantic search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Query text that produced this result
    pub query: String,
    /// Memories ranked by the service, most relevant first
    pub memories: Vec<Memory>,
    /// Count reported by the service; may exceed `memories.len()`
    pub count: usize,
}

impl SearchResult {
    /// Whether the search returned no memories
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}

/// Writable fields of a memory, used by `store` and `store_many`.
///
/// Empty optionals are omitted from the request body rather than sent as
/// null.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StoreRequest {
    /// Memory text
    pub content: String,
    /// Storage tier
    pub tier: MemoryTier,
    /// Owning user
    #[serde(skip_serializing_if = "is_blank")]
    pub user_id: Option<String>,
    /// Tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Opaque metadata
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, JsonValue>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

impl StoreRequest {
    /// Create a request for a semantic-tier memory
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the owning user
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the storage tier
    pub fn tier(mut self, tier: MemoryTier) -> Self {
        self.tier = tier;
        self
    }

    /// Set the tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Add a single tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set one metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl From<&str> for StoreRequest {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for StoreRequest {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// Response to a single store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreResponse {
    /// Identifier of the new memory
    pub id: String,
    /// Whether the service stored it
    #[serde(default = "default_true")]
    pub stored: bool,
}

fn default_true() -> bool {
    true
}

/// Response to a batch store.
///
/// A non-zero `failed` count is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct BatchStoreResponse {
    /// Identifiers of the memories that were stored
    #[serde(default)]
    pub ids: Vec<String>,
    /// Number of memories stored
    #[serde(default)]
    pub stored: usize,
    /// Number of memories rejected
    #[serde(default)]
    pub failed: usize,
}

/// Parameters of a semantic search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Query text
    pub query: String,
    /// Maximum number of memories to return
    pub limit: usize,
    /// Restrict to one user
    pub user_id: Option<String>,
    /// Restrict to these tiers
    pub tiers: Vec<MemoryTier>,
}

/// Default number of memories returned by a search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

impl SearchQuery {
    /// Create a query with the default limit and no filters
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            user_id: None,
            tiers: Vec::new(),
        }
    }

    /// Set the result limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Restrict to one user
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Restrict to the given tiers
    pub fn tiers(mut self, tiers: impl IntoIterator<Item = MemoryTier>) -> Self {
        self.tiers = tiers.into_iter().collect();
        self
    }
}

impl From<&str> for SearchQuery {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for SearchQuery {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// Default token budget for context assembly
pub const DEFAULT_CONTEXT_TOKENS: usize = 2000;

/// Parameters of context assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextQuery {
    /// Query text
    pub query: String,
    /// Restrict to one user
    pub user_id: Option<String>,
    /// Estimated token budget for the assembled context
    pub max_tokens: usize,
}

impl ContextQuery {
    /// Create a query with the default token budget
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            max_tokens: DEFAULT_CONTEXT_TOKENS,
        }
    }

    /// Restrict to one user
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the token budget
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl From<&str> for ContextQuery {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for ContextQuery {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}
