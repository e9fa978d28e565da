//! # Eviction hooks
//!
//! Caches retain every entry by default. An [`EvictionHook`] attached to a
//! cache is called after each successful store and may remove other stored
//! entries through the [`EntryStore`] view it receives.
//!
//! Two bounded hooks are provided:
//!
//! * [`FifoLimit`] - keeps at most `limit` entries, evicting the oldest
//!   insertions first
//! * [`RandomLimit`] - keeps at most `limit` entries, evicting randomly chosen
//!   ones

use crate::CacheKey;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::trace;

/// View of a cache's stored entries handed to an [`EvictionHook`].
///
/// Only stored entries are visible: keys whose computation is still in
/// flight are neither counted nor removable.
pub trait EntryStore {
    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes a stored entry. Returns `false` if it was not present.
    fn remove(&self, key: &CacheKey) -> bool;

    /// The `n`-th stored key in the store's (unspecified) iteration order.
    fn nth_key(&self, n: usize) -> Option<CacheKey>;
}

/// Policy callback invoked after every successful store.
///
/// Hooks run outside the cache's structural locks, so they may freely call
/// back into the [`EntryStore`].
pub trait EvictionHook: Send + Sync {
    /// Called after `key` has been stored.
    fn on_insert(&self, key: &CacheKey, store: &dyn EntryStore);

    /// Called after the cache has been cleared.
    fn on_clear(&self) {}
}

/// Bounds a cache to `limit` entries, evicting in insertion order.
///
/// # Examples
///
/// ```
/// use memoist_core::{FifoLimit, MemoCache};
///
/// let cache: MemoCache<u64> = MemoCache::builder()
///     .eviction(FifoLimit::new(100))
///     .build();
/// assert_eq!(cache.size(), 0);
/// ```
#[derive(Debug)]
pub struct FifoLimit {
    limit: usize,
    order: Mutex<VecDeque<CacheKey>>,
}

impl FifoLimit {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            order: Mutex::new(VecDeque::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl EvictionHook for FifoLimit {
    fn on_insert(&self, key: &CacheKey, store: &dyn EntryStore) {
        let mut order = self.order.lock();
        order.push_back(*key);

        while store.len() > self.limit {
            match order.pop_front() {
                // Keys already dropped by the store are skipped
                Some(oldest) => {
                    if store.remove(&oldest) {
                        trace!(key = %oldest, "evicted (fifo)");
                    }
                }
                None => break,
            }
        }
    }

    fn on_clear(&self) {
        self.order.lock().clear();
    }
}

/// Bounds a cache to `limit` entries, evicting random entries other than the
/// one just stored.
#[derive(Debug)]
pub struct RandomLimit {
    limit: usize,
    rng: Mutex<fastrand::Rng>,
}

impl RandomLimit {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Uses a seeded generator so eviction choices are reproducible.
    pub fn with_seed(limit: usize, seed: u64) -> Self {
        Self {
            limit,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl EvictionHook for RandomLimit {
    fn on_insert(&self, key: &CacheKey, store: &dyn EntryStore) {
        let mut rng = self.rng.lock();

        loop {
            // Read once: concurrent removals may shrink the store at any time
            let len = store.len();
            if len <= self.limit {
                break;
            }

            let mut n = rng.usize(..len);
            let mut victim = store.nth_key(n);
            if victim.as_ref() == Some(key) && len > 1 {
                n = (n + 1) % len;
                victim = store.nth_key(n);
            }

            match victim {
                Some(victim) => {
                    if store.remove(&victim) {
                        trace!(key = %victim, "evicted (random)");
                    }
                }
                None => break,
            }
        }
    }
}
