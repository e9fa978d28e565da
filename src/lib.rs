//! # Memoist
//!
//! A thread-safe memoization library for Rust: wrap a function once, and
//! repeated calls with equal arguments return the stored result instead of
//! recomputing it.
//!
//! ## Features
//!
//! - **Explicit composition**: [`memoize`] takes an identifier, a cache and a
//!   callable and returns a new callable; no global state
//! - **Canonical keys**: arguments are canonicalized (keyword order never
//!   matters) and hashed with SHA-256
//! - **At-most-once**: concurrent callers with equal arguments share one
//!   computation, while different arguments never block each other
//! - **Result-aware**: errors propagate to every waiting caller and are never
//!   cached
//! - **Type-checked arguments**: only a closed set of canonicalizable values
//!   ([`ArgValue`]) can take part in a key; sets and opaque values are rejected
//!
//! ## Quick Start
//!
//! ```rust
//! use memoist::{memoize, Args, MemoCache};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(MemoCache::new());
//! let scaled_power = memoize("scaled_power", Arc::clone(&cache), |args: &Args| {
//!     let base = args.get(0).and_then(|v| v.as_f64()).unwrap_or(0.0);
//!     let exp = args.get(1).and_then(|v| v.as_int()).unwrap_or(0) as i32;
//!     Ok::<_, Infallible>(base.powi(exp) / 4.0 * 100.0)
//! });
//!
//! // First call computes the result
//! let first = scaled_power.call(&Args::new().arg(12).arg(14)).unwrap();
//! // Second call returns the stored result
//! let second = scaled_power.call(&Args::new().arg(12).arg(14)).unwrap();
//! assert_eq!(first, second);
//!
//! // Different arguments, different entry
//! scaled_power.call(&Args::new().arg(12).arg(15)).unwrap();
//! assert_eq!(cache.size(), 2);
//! ```
//!
//! ## Error Handling
//!
//! Computations return `Result`. Only `Ok` values are stored:
//!
//! ```rust
//! use memoist::{memoize, Args, MemoCache, MemoError};
//! use std::sync::Arc;
//!
//! let divide = memoize("divide", Arc::new(MemoCache::new()), |args: &Args| {
//!     let a = args.get(0).and_then(|v| v.as_int()).unwrap_or(0);
//!     let b = args.get(1).and_then(|v| v.as_int()).unwrap_or(0);
//!     if b == 0 {
//!         Err("Division by zero".to_string())
//!     } else {
//!         Ok(a / b)
//!     }
//! });
//!
//! assert_eq!(divide.call(&Args::new().arg(10).arg(2)), Ok(5));
//! assert_eq!(
//!     divide.call(&Args::new().arg(10).arg(0)),
//!     Err(MemoError::ComputationFailed("Division by zero".to_string()))
//! );
//! assert_eq!(divide.cache().size(), 1);
//! ```
//!
//! ## Unsupported Arguments
//!
//! ```rust
//! use memoist::{memoize, Args, KeyError, MemoCache, MemoError};
//! use std::collections::HashSet;
//! use std::sync::Arc;
//!
//! let len = memoize("len", Arc::new(MemoCache::new()), |args: &Args| {
//!     Ok::<_, String>(args.len())
//! });
//!
//! let tags: HashSet<&str> = ["a", "b"].into_iter().collect();
//! let err = len.call(&Args::new().arg(tags)).unwrap_err();
//! assert!(matches!(
//!     err,
//!     MemoError::InvalidKey(KeyError::UnsupportedArgumentType { .. })
//! ));
//! ```
//!
//! ## Logging
//!
//! Hits, misses, joins, failures and evictions are emitted as `tracing`
//! events. Install any subscriber to see them; the library installs none.

pub use memoist_core::*;
