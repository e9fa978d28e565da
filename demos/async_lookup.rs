//! Example demonstrating async memoization with concurrent tasks.
//!
//! Ten tasks request the same user at once; the lookup runs a single time and
//! every task receives its result.

use memoist_async::{memoize_async, Args, AsyncMemoCache, Lookup};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

static LOOKUPS: AtomicUsize = AtomicUsize::new(0);

async fn fetch_user(args: Args) -> Result<String, String> {
    let id = args
        .get(0)
        .and_then(|v| v.as_int())
        .ok_or_else(|| "missing user id".to_string())?;
    LOOKUPS.fetch_add(1, Ordering::SeqCst);
    println!("  [MISS] Fetching user {id}");
    tokio::time::sleep(Duration::from_millis(100)).await;
    if id < 0 {
        return Err(format!("no user with id {id}"));
    }
    Ok(format!("user-{id}"))
}

#[tokio::main]
async fn main() {
    println!("=== Async Memoization Demo ===\n");

    let cache = Arc::new(AsyncMemoCache::builder().name("users").build());
    let users = Arc::new(memoize_async("fetch_user", Arc::clone(&cache), fetch_user));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let users = Arc::clone(&users);
            tokio::spawn(async move { users.call_with_lookup(Args::new().arg(7)).await })
        })
        .collect();

    let mut joined = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok((name, lookup))) => {
                if lookup == Lookup::Joined {
                    joined += 1;
                }
                println!("  got {name} ({lookup:?})");
            }
            Ok(Err(err)) => println!("  failed: {err}"),
            Err(err) => println!("  task failed: {err}"),
        }
    }
    println!(
        "\nLookups executed: {}, joined callers: {joined}",
        LOOKUPS.load(Ordering::SeqCst)
    );

    // Failures are returned but never stored
    for _ in 0..2 {
        match users.call(Args::new().arg(-1)).await {
            Ok(name) => println!("  unexpected {name}"),
            Err(err) => println!("  error: {err}"),
        }
    }
    println!("Stored entries: {}", cache.size());
}
