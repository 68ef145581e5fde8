//! Basic usage example
//!
//! Stores, searches, and deletes memories, then builds a prompt context.
//!
//! ```bash
//! export VELIXAR_API_KEY="vlx_your_key_here"
//! cargo run --example basic_usage
//! ```

use velixar::{ContextQuery, MemoryTier, Result, SearchQuery, StoreRequest, Velixar, VelixarError};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("velixar=debug,basic_usage=info")
        .init();

    let client = Velixar::from_env()?;

    // Simple store
    let memory_id = client.store("User prefers dark mode").await?;
    println!("Stored memory: {memory_id}");

    // Store with options
    client
        .store(
            StoreRequest::new("User's favorite programming language is Rust")
                .user_id("user_123")
                .tier(MemoryTier::Pinned)
                .tags(["preferences", "programming"])
                .metadata("source", "onboarding"),
        )
        .await?;

    // Batch store
    let batch = client
        .store_many([
            StoreRequest::new("User works in UTC+1").user_id("user_123"),
            StoreRequest::new("User uses Neovim").user_id("user_123"),
        ])
        .await?;
    println!("Batch: {} stored, {} failed", batch.stored, batch.failed);

    // Search with filters
    let results = client
        .search(
            SearchQuery::new("user settings")
                .user_id("user_123")
                .limit(5)
                .tiers([MemoryTier::Pinned, MemoryTier::Semantic]),
        )
        .await?;
    println!("Found {} memories", results.count);
    for memory in &results.memories {
        println!("  [{:.2}] {}", memory.score.unwrap_or_default(), memory.content);
    }

    // Context for an LLM prompt
    let context = client
        .get_context(
            ContextQuery::new("What does the user prefer?")
                .user_id("user_123")
                .max_tokens(2000),
        )
        .await?;
    println!("Based on the following context about the user:\n\n{context}");

    // Get and delete
    let memory = client.get(&memory_id).await?;
    println!("Memory {} in tier {}", memory.id, memory.tier);

    match client.delete(&memory_id).await {
        Ok(deleted) => println!("Deleted: {deleted}"),
        Err(VelixarError::NotFound { .. }) => println!("Already gone"),
        Err(e) => return Err(e),
    }

    Ok(())
}
