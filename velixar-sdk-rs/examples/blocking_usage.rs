//! Blocking client example
//!
//! ```bash
//! export VELIXAR_API_KEY="vlx_your_key_here"
//! cargo run --example blocking_usage
//! ```

use velixar::blocking::Velixar;
use velixar::{Result, VelixarError};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("velixar=debug")
        .init();

    // The pooled connection is released when `client` goes out of scope
    let client = Velixar::from_env()?;

    let id = client.store("User prefers short answers")?;
    println!("Stored memory: {id}");

    match client.search("answer style") {
        Ok(results) => {
            for memory in results.memories {
                println!("- {}", memory.content);
            }
        },
        Err(VelixarError::RateLimit { retry_after }) => {
            println!("Rate limited, retry after {retry_after:?}s");
        },
        Err(e) => return Err(e),
    }

    println!("Deleted: {}", client.delete(&id)?);
    Ok(())
}
