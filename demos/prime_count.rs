//! Example combining memoization with structured logging and timing.
//!
//! Run with `RUST_LOG=memoist_core=trace` to see every hit, miss and join
//! emitted by the cache.

use memoist::{memoize, Args, MemoCache};
use std::convert::Infallible;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn count_primes(args: &Args) -> Result<u64, Infallible> {
    let limit = args.get(0).and_then(|v| v.as_int()).unwrap_or(0).max(0) as u64;
    let count = (2..=limit)
        .filter(|n| (2..).take_while(|d| d * d <= *n).all(|d| n % d != 0))
        .count() as u64;
    Ok(count)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cache = Arc::new(MemoCache::builder().name("primes").build());
    let primes = Arc::new(memoize("count_primes", Arc::clone(&cache), count_primes));

    for round in 1..=2 {
        let start = Instant::now();
        let count = primes
            .call(&Args::new().arg(200_000))
            .expect("computation is infallible");
        info!(round, count, elapsed = ?start.elapsed(), "counted primes up to 200000");
    }

    // Eight threads asking for the same new limit share one computation
    let start = Instant::now();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let primes = Arc::clone(&primes);
            thread::spawn(move || primes.call_with_lookup(&Args::new().arg(300_000)))
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(Ok((count, lookup))) => info!(count, ?lookup, "thread finished"),
            Ok(Err(err)) => info!(%err, "thread failed"),
            Err(_) => info!("thread panicked"),
        }
    }
    info!(elapsed = ?start.elapsed(), entries = cache.size(), "concurrent round done");

    #[cfg(feature = "stats")]
    {
        let stats = cache.stats();
        info!(
            hits = stats.hits(),
            misses = stats.misses(),
            joined = stats.joined(),
            "cache statistics"
        );
    }
}
