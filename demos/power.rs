//! Example demonstrating basic memoization of a pure numeric function.
//!
//! The first call with a given pair of arguments computes the result, the
//! second returns the stored value, and a call with different arguments adds
//! a second entry.

use memoist::{memoize, Args, Lookup, MemoCache};
use std::convert::Infallible;
use std::sync::Arc;

fn scaled_power(args: &Args) -> Result<f64, Infallible> {
    let value1 = args.get(0).and_then(|v| v.as_f64()).unwrap_or(0.0);
    let value2 = args.get(1).and_then(|v| v.as_f64()).unwrap_or(0.0);
    println!("  [MISS] Computing ({value1} ^ {value2} / 4) * 100");
    Ok((value1.powf(value2) / 4.0) * 100.0)
}

fn main() {
    println!("=== Memoized Power Demo ===\n");

    let cache = Arc::new(MemoCache::builder().name("power").build());
    let power = memoize("scaled_power", Arc::clone(&cache), scaled_power);

    for (a, b) in [(12, 14), (12, 14), (12, 15)] {
        let args = Args::new().arg(a).arg(b);
        let key = power.key_for(&args).expect("integer arguments are canonical");
        let (value, lookup) = power
            .call_with_lookup(&args)
            .expect("computation is infallible");

        let marker = match lookup {
            Lookup::Hit => "HIT",
            Lookup::Computed => "COMPUTED",
            Lookup::Joined => "JOINED",
        };
        println!("f({a}, {b}) = {value:e} [{marker}] key={key}");
    }

    println!("\nStored entries: {}", cache.size());
    assert_eq!(cache.size(), 2);

    #[cfg(feature = "stats")]
    {
        let stats = cache.stats();
        println!("\n📊 Cache Statistics:");
        println!("  Hits:     {}", stats.hits());
        println!("  Misses:   {}", stats.misses());
        println!("  Hit rate: {:.2}%", stats.hit_rate() * 100.0);
    }

    cache.clear();
    println!("\nAfter clear: {} entries", cache.size());
}
