//! # Velixar SDK for Rust
//!
//! A Rust client for the Velixar memory API: store, search, retrieve, and
//! delete memories for your users, and assemble token-bounded context for
//! language-model prompts.
//!
//! ## Features
//!
//! - **Async Client**: [`Velixar`], built on `tokio` and `reqwest`
//! - **Blocking Client**: [`blocking::Velixar`] with the same operations
//! - **Retries**: transient network failures and rate limits are retried
//!   with exponential backoff
//! - **Typed Errors**: every failure maps to a [`VelixarError`] variant
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use velixar::{Result, SearchQuery, Velixar};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Reads VELIXAR_API_KEY
//!     let client = Velixar::from_env()?;
//!
//!     client.store("User prefers dark mode").await?;
//!
//!     let results = client.search(SearchQuery::new("preferences").limit(5)).await?;
//!     for memory in &results.memories {
//!         println!("{:?} {}", memory.score, memory.content);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod api;
pub mod blocking;
mod client;
pub mod config;
pub mod context;
mod errors;
pub mod retry;
pub mod transport;
mod types;

// Re-export main types and functions
pub use client::Velixar;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use errors::{Result, TransportError, VelixarError, classify};
pub use retry::RetryPolicy;
pub use types::{
    BatchStoreResponse, ContextQuery, DEFAULT_CONTEXT_TOKENS, DEFAULT_SEARCH_LIMIT, Memory,
    MemoryTier, SearchQuery, SearchResult, StoreRequest, StoreResponse,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ContextQuery, Memory, MemoryTier, Result, SearchQuery, StoreRequest, Velixar,
        VelixarError,
    };
}
