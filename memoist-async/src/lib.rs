//! # Memoist Async
//!
//! Memoization for async functions.
//!
//! This crate offers the same at-most-once memoization contract as
//! `memoist-core`, for callers running on an async runtime. Callers waiting on
//! an in-flight computation are suspended rather than blocking their thread,
//! and a computation whose future is dropped releases its waiters.
//!
//! ## Features
//!
//! - **Lock-sharded storage**: entries live in a [DashMap](https://docs.rs/dashmap)
//! - **Single flight**: one computation per key, shared by all concurrent callers
//! - **Cancellation safe**: dropping the computing future never wedges waiters
//! - **Eviction hooks and statistics**: shared with `memoist-core`
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! memoist-async = "0.1.0"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ```rust
//! use memoist_async::{memoize_async, AsyncMemoCache};
//! use memoist_core::Args;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = Arc::new(AsyncMemoCache::new());
//! let slow_square = memoize_async("slow_square", cache, |args: Args| async move {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     let n = args.get(0).and_then(|v| v.as_int()).unwrap_or(0);
//!     Ok::<_, String>(n * n)
//! });
//!
//! // First call sleeps, second returns the stored value
//! assert_eq!(slow_square.call(Args::new().arg(9)).await, Ok(81));
//! assert_eq!(slow_square.call(Args::new().arg(9)).await, Ok(81));
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! Caches are `Send + Sync` whenever the stored value and error types are, and
//! can be shared between tasks and threads behind an `Arc`.
//!
mod cache;
mod memoize;

pub use cache::{AsyncMemoCache, AsyncMemoCacheBuilder};
pub use memoize::{memoize_async, AsyncMemoized};

// Re-export the shared vocabulary from memoist-core
pub use memoist_core::{
    ArgValue, Args, CacheKey, EvictionHook, FifoLimit, KeyDeriver, KeyError, Lookup, MemoError,
    RandomLimit,
};

#[cfg(feature = "stats")]
pub use memoist_core::CacheStats;

// Re-export common dependencies that users might need
pub use dashmap;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{memoize_async, ArgValue, Args, AsyncMemoCache, Lookup, MemoError};
}
