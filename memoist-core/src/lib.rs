//! # Memoist Core
//!
//! Core building blocks of the Memoist memoization library.
//!
//! ## Features
//!
//! - **Canonical key derivation**: invocations are serialized into a
//!   prefix-free canonical form and hashed with SHA-256
//! - **At-most-once computation**: concurrent callers for the same key share a
//!   single computation; different keys never block each other
//! - **Failure transparency**: errors are propagated to every waiting caller
//!   and never cached
//! - **Eviction hooks**: unbounded by default, with optional FIFO and random
//!   size limits
//! - **Statistics**: hit/miss/join counters (with the `stats` feature)
//!
//! ## Module Organization
//!
//! - [`value`] - Argument values (`ArgValue`) and captured argument lists (`Args`)
//! - [`key`] - Canonical form and cache key derivation
//! - [`cache`] - The concurrent `MemoCache` store
//! - [`eviction`] - Eviction hook extension point and bounded hooks
//! - [`memoize`](mod@memoize) - Wrapper composing a callable with a cache
//! - [`error`] - Error types
//!
pub mod cache;
pub mod error;
pub mod eviction;
pub mod key;
pub mod memoize;
pub mod value;

#[cfg(feature = "stats")]
mod stats;

pub use cache::{Lookup, MemoCache, MemoCacheBuilder};
pub use error::{KeyError, MemoError};
pub use eviction::{EntryStore, EvictionHook, FifoLimit, RandomLimit};
pub use key::{CacheKey, CanonicalForm, KeyDeriver};
pub use memoize::{memoize, Memoized};
pub use value::{ArgValue, Args};

#[cfg(feature = "stats")]
pub use stats::CacheStats;
