//! Context assembly for language-model prompts
//!
//! Token counts here are a client-side estimate (`words * 1.3`), not an
//! authoritative tokenizer count.

use crate::types::{ContextQuery, Memory, SearchQuery};

/// Estimated tokens per whitespace-separated word
pub const TOKENS_PER_WORD: f64 = 1.3;

/// Number of memories fetched for context assembly
pub const CONTEXT_SEARCH_LIMIT: usize = 10;

/// Estimate the token cost of a text
pub fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * TOKENS_PER_WORD
}

/// Greedily join memory contents in the given order until the next one
/// would push the estimate over `max_tokens`.
pub fn assemble(memories: &[Memory], max_tokens: usize) -> String {
    let budget = max_tokens as f64;
    let mut used = 0.0;
    let mut parts = Vec::new();

    for memory in memories {
        let cost = estimate_tokens(&memory.content);
        if used + cost > budget {
            break;
        }
        parts.push(memory.content.as_str());
        used += cost;
    }

    parts.join("\n\n")
}

/// Search issued by `get_context`
pub(crate) fn search_for(query: &ContextQuery) -> SearchQuery {
    let mut search = SearchQuery::new(query.query.clone()).limit(CONTEXT_SEARCH_LIMIT);
    if let Some(user_id) = &query.user_id {
        search = search.user_id(user_id.clone());
    }
    search
}
