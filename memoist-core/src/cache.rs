use crate::eviction::{EntryStore, EvictionHook};
use crate::CacheKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[cfg(feature = "stats")]
use crate::CacheStats;

/// How a `get_or_compute` call was answered.
///
/// This is the hit/miss event of a memoized call, returned as metadata so
/// callers can log or count it with whatever backend they use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// The value was already stored.
    Hit,
    /// This caller ran the computation and stored its result.
    Computed,
    /// Another caller was computing the value; this caller waited for it.
    Joined,
}

impl Lookup {
    /// `true` unless this caller ran the computation itself.
    pub fn is_hit(self) -> bool {
        !matches!(self, Lookup::Computed)
    }
}

/// Outcome of one computation, shared with every waiter.
#[derive(Clone)]
enum Outcome<V, E> {
    Value(V),
    Failed(E),
    /// The computing caller panicked; waiters retry.
    Abandoned,
}

type Flight<V, E> = Arc<OnceCell<Outcome<V, E>>>;

enum Slot<V, E> {
    Ready(V),
    Pending(Flight<V, E>),
}

/// A thread-safe memoization store with compute-on-miss.
///
/// `MemoCache` maps [`CacheKey`]s to immutable values. Its central operation,
/// [`get_or_compute`](MemoCache::get_or_compute), returns the stored value
/// for a key or runs a computation to produce it.
///
/// # At-most-once per key
///
/// When a miss is detected, the key is marked in-progress while its shard
/// lock is still held. The computation then runs without any lock. Callers
/// arriving for the same key meanwhile block until the outcome is published
/// and receive it instead of computing again. Misses on different keys never
/// wait for each other.
///
/// If the computation fails, nothing is stored, the error is returned to the
/// computing caller and a clone of it to every waiter, and the key becomes
/// absent again. If the computation panics, waiters are released and retry.
///
/// # Thread Safety
///
/// Entries live in a [`DashMap`], so structural changes lock a single shard.
/// Waiters block on a [`OnceCell`] holding the outcome.
///
/// # Examples
///
/// ```
/// use memoist_core::{KeyDeriver, Lookup, MemoCache};
/// use std::convert::Infallible;
///
/// let cache: MemoCache<u64, Infallible> = MemoCache::new();
/// let key = KeyDeriver::new().derive("square", &[12.into()], &[]).unwrap();
///
/// let (v, lookup) = cache.get_or_compute_with_lookup(key, || Ok(12 * 12)).unwrap();
/// assert_eq!((v, lookup), (144, Lookup::Computed));
///
/// let (v, lookup) = cache
///     .get_or_compute_with_lookup(key, || unreachable!("cached"))
///     .unwrap();
/// assert_eq!((v, lookup), (144, Lookup::Hit));
///
/// cache.clear();
/// assert_eq!(cache.size(), 0);
/// assert!(!cache.contains(&key));
/// ```
pub struct MemoCache<V, E = std::convert::Infallible> {
    name: Option<String>,
    slots: DashMap<CacheKey, Slot<V, E>>,
    stored: AtomicUsize,
    eviction: Option<Box<dyn EvictionHook>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<V, E> MemoCache<V, E> {
    /// Creates an empty, unbounded cache.
    pub fn new() -> Self {
        MemoCacheBuilder::new().build()
    }

    /// Starts configuring a cache.
    pub fn builder() -> MemoCacheBuilder<V, E> {
        MemoCacheBuilder::new()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of stored entries. Keys still being computed are not counted.
    pub fn size(&self) -> usize {
        self.stored.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns `true` if a value is stored for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots
            .get(key)
            .map(|slot| matches!(*slot, Slot::Ready(_)))
            .unwrap_or(false)
    }

    /// Removes every stored entry.
    ///
    /// Computations in flight when `clear` runs are not cancelled: they keep
    /// deduplicating callers and store their result when they finish.
    pub fn clear(&self) {
        // Notified first: a key stored while the map is being cleared must
        // stay tracked by the hook
        if let Some(hook) = &self.eviction {
            hook.on_clear();
        }

        let mut removed = 0;
        self.slots.retain(|_, slot| match slot {
            Slot::Ready(_) => {
                removed += 1;
                false
            }
            Slot::Pending(_) => true,
        });
        self.stored.fetch_sub(removed, Ordering::AcqRel);
        debug!(cache = self.label(), removed, "cache cleared");
    }

    /// Returns the statistics counters of this cache.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("memo")
    }

    fn record(&self, lookup: Lookup) {
        #[cfg(feature = "stats")]
        match lookup {
            Lookup::Hit => self.stats.record_hit(),
            Lookup::Computed => self.stats.record_miss(),
            Lookup::Joined => self.stats.record_join(),
        }
        #[cfg(not(feature = "stats"))]
        let _ = lookup;
    }

    fn record_failure(&self) {
        #[cfg(feature = "stats")]
        self.stats.record_failure();
    }

    /// Drops the in-progress mark for `key` if it still belongs to `flight`.
    fn release(&self, key: &CacheKey, flight: &Flight<V, E>) {
        self.slots.remove_if(key, |_, slot| {
            matches!(slot, Slot::Pending(f) if Arc::ptr_eq(f, flight))
        });
    }

    fn evict_after_insert(&self, key: &CacheKey) {
        if let Some(hook) = &self.eviction {
            hook.on_insert(
                key,
                &Entries {
                    slots: &self.slots,
                    stored: &self.stored,
                },
            );
        }
    }
}

impl<V: Clone, E: Clone> MemoCache<V, E> {
    /// Returns the value stored for `key`, running `compute` on a miss.
    ///
    /// # Behavior
    ///
    /// * Stored: returns a clone without calling `compute`
    /// * Absent: calls `compute` exactly once, stores an `Ok` result and
    ///   returns it
    /// * In flight on another caller: blocks until that computation ends and
    ///   returns its outcome
    ///
    /// # Errors
    ///
    /// Returns the error of the computation that served this call. Errors are
    /// never stored.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_or_compute_with_lookup(key, compute)
            .map(|(value, _)| value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), also reporting whether
    /// the call was a hit, a computation, or a join.
    pub fn get_or_compute_with_lookup<F>(&self, key: CacheKey, compute: F) -> Result<(V, Lookup), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let flight = loop {
            let waiting = match self.slots.entry(key) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Ready(value) => {
                        let value = value.clone();
                        self.record(Lookup::Hit);
                        trace!(cache = self.label(), %key, "hit");
                        return Ok((value, Lookup::Hit));
                    }
                    Slot::Pending(flight) => Arc::clone(flight),
                },
                Entry::Vacant(entry) => {
                    let flight: Flight<V, E> = Arc::new(OnceCell::new());
                    entry.insert(Slot::Pending(Arc::clone(&flight)));
                    break flight;
                }
            };

            trace!(cache = self.label(), %key, "joining in-flight computation");
            match waiting.wait() {
                Outcome::Value(value) => {
                    self.record(Lookup::Joined);
                    return Ok((value.clone(), Lookup::Joined));
                }
                Outcome::Failed(err) => {
                    self.record(Lookup::Joined);
                    return Err(err.clone());
                }
                Outcome::Abandoned => {
                    debug!(cache = self.label(), %key, "in-flight computation abandoned, retrying");
                }
            }
        };

        self.record(Lookup::Computed);
        debug!(cache = self.label(), %key, "miss, computing");

        let guard = FlightGuard {
            cache: self,
            key,
            flight,
            armed: true,
        };
        let result = compute();
        guard.finish(result).map(|value| (value, Lookup::Computed))
    }

    /// Returns a clone of the stored value without computing anything.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.slots.get(key).and_then(|slot| match &*slot {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending(_) => None,
        })
    }

    /// Stores `value` under `key` unless the key is already stored or being
    /// computed. Returns `true` if the value was stored.
    ///
    /// Stored entries are immutable; use this to warm a cache, not to update
    /// it.
    pub fn insert_if_absent(&self, key: CacheKey, value: V) -> bool {
        match self.slots.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Slot::Ready(value));
                self.stored.fetch_add(1, Ordering::AcqRel);
                self.evict_after_insert(&key);
                true
            }
        }
    }

    /// Replaces the in-progress mark of `flight` with `value`. Returns
    /// `false` if the mark is no longer there.
    fn install(&self, key: CacheKey, flight: &Flight<V, E>, value: &V) -> bool {
        match self.slots.get_mut(&key) {
            Some(mut slot) if matches!(&*slot, Slot::Pending(f) if Arc::ptr_eq(f, flight)) => {
                *slot = Slot::Ready(value.clone());
                self.stored.fetch_add(1, Ordering::AcqRel);
                true
            }
            _ => false,
        }
    }
}

impl<V, E> Default for MemoCache<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for MemoCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("in_flight", &(self.slots.len().saturating_sub(self.size())))
            .field("eviction", &self.eviction.is_some())
            .finish()
    }
}

/// Publishes the outcome of a computation exactly once, also when the
/// computing closure unwinds.
struct FlightGuard<'a, V: Clone, E: Clone> {
    cache: &'a MemoCache<V, E>,
    key: CacheKey,
    flight: Flight<V, E>,
    armed: bool,
}

impl<V: Clone, E: Clone> FlightGuard<'_, V, E> {
    fn finish(mut self, result: Result<V, E>) -> Result<V, E> {
        self.armed = false;
        let cache = self.cache;
        match result {
            Ok(value) => {
                let stored = cache.install(self.key, &self.flight, &value);
                let _ = self.flight.set(Outcome::Value(value.clone()));
                if stored {
                    cache.evict_after_insert(&self.key);
                }
                Ok(value)
            }
            Err(err) => {
                cache.release(&self.key, &self.flight);
                let _ = self.flight.set(Outcome::Failed(err.clone()));
                cache.record_failure();
                debug!(cache = cache.label(), key = %self.key, "computation failed, nothing stored");
                Err(err)
            }
        }
    }
}

impl<V: Clone, E: Clone> Drop for FlightGuard<'_, V, E> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.release(&self.key, &self.flight);
            let _ = self.flight.set(Outcome::Abandoned);
            warn!(cache = self.cache.label(), key = %self.key, "computation panicked, releasing waiters");
        }
    }
}

/// [`EntryStore`] view over a cache's slot map.
struct Entries<'a, V, E> {
    slots: &'a DashMap<CacheKey, Slot<V, E>>,
    stored: &'a AtomicUsize,
}

impl<V, E> EntryStore for Entries<'_, V, E> {
    fn len(&self) -> usize {
        self.stored.load(Ordering::Acquire)
    }

    fn remove(&self, key: &CacheKey) -> bool {
        let removed = self
            .slots
            .remove_if(key, |_, slot| matches!(slot, Slot::Ready(_)))
            .is_some();
        if removed {
            self.stored.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    fn nth_key(&self, n: usize) -> Option<CacheKey> {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .nth(n)
            .map(|entry| *entry.key())
    }
}

/// Builder for [`MemoCache`].
///
/// # Examples
///
/// ```
/// use memoist_core::{FifoLimit, MemoCache};
///
/// let cache: MemoCache<String, std::io::ErrorKind> = MemoCache::builder()
///     .name("user_profiles")
///     .capacity(1024)
///     .eviction(FifoLimit::new(1000))
///     .build();
/// assert_eq!(cache.name(), Some("user_profiles"));
/// ```
pub struct MemoCacheBuilder<V, E = std::convert::Infallible> {
    name: Option<String>,
    capacity: usize,
    shard_amount: Option<usize>,
    eviction: Option<Box<dyn EvictionHook>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E> MemoCacheBuilder<V, E> {
    pub fn new() -> Self {
        Self {
            name: None,
            capacity: 0,
            shard_amount: None,
            eviction: None,
            _marker: PhantomData,
        }
    }

    /// Name used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Initial capacity of the underlying map.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Number of map shards. Must be a power of two greater than one.
    pub fn shard_amount(mut self, shard_amount: usize) -> Self {
        self.shard_amount = Some(shard_amount);
        self
    }

    /// Attaches an eviction hook. Without one, retention is unbounded.
    pub fn eviction(mut self, hook: impl EvictionHook + 'static) -> Self {
        self.eviction = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> MemoCache<V, E> {
        let slots = match self.shard_amount {
            Some(shards) if shards > 1 && shards.is_power_of_two() => {
                DashMap::with_capacity_and_shard_amount(self.capacity, shards)
            }
            _ => DashMap::with_capacity(self.capacity),
        };

        MemoCache {
            name: self.name,
            slots,
            stored: AtomicUsize::new(0),
            eviction: self.eviction,
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }
}

impl<V, E> Default for MemoCacheBuilder<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for MemoCacheBuilder<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCacheBuilder")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("shard_amount", &self.shard_amount)
            .field("eviction", &self.eviction.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FifoLimit, KeyDeriver};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Barrier, Weak};
    use std::thread;
    use std::time::Duration;

    fn key(n: i64) -> CacheKey {
        KeyDeriver::new().derive("test", &[n.into()], &[]).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let cache: MemoCache<i64, String> = MemoCache::new();
        let calls = AtomicUsize::new(0);

        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        };
        assert_eq!(cache.get_or_compute(key(1), compute), Ok(42));
        assert_eq!(cache.get_or_compute(key(1), compute), Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.size(), 1);
        assert!(cache.contains(&key(1)));
        assert_eq!(cache.get(&key(1)), Some(42));
    }

    #[test]
    fn test_lookup_metadata() {
        let cache: MemoCache<i64> = MemoCache::new();
        let (_, first) = cache.get_or_compute_with_lookup(key(1), || Ok(1)).unwrap();
        let (_, second) = cache.get_or_compute_with_lookup(key(1), || Ok(2)).unwrap();
        assert_eq!(first, Lookup::Computed);
        assert_eq!(second, Lookup::Hit);
        assert!(!first.is_hit());
        assert!(second.is_hit());
    }

    #[test]
    fn test_failure_is_not_stored() {
        let cache: MemoCache<i64, String> = MemoCache::new();
        assert_eq!(
            cache.get_or_compute(key(1), || Err("boom".to_string())),
            Err("boom".to_string())
        );
        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.size(), 0);

        assert_eq!(cache.get_or_compute(key(1), || Ok(7)), Ok(7));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_clear_removes_entries() {
        let cache: MemoCache<i64> = MemoCache::new();
        cache.get_or_compute(key(1), || Ok(1)).unwrap();
        cache.get_or_compute(key(2), || Ok(2)).unwrap();
        assert_eq!(cache.size(), 2);

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(cache.is_empty());
        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.get(&key(2)), None);

        assert_eq!(cache.get_or_compute(key(1), || Ok(10)), Ok(10));
    }

    #[test]
    fn test_insert_if_absent_never_overwrites() {
        let cache: MemoCache<i64> = MemoCache::new();
        assert!(cache.insert_if_absent(key(1), 1));
        assert!(!cache.insert_if_absent(key(1), 2));
        assert_eq!(cache.get(&key(1)), Some(1));
        assert_eq!(cache.get_or_compute(key(1), || Ok(3)), Ok(1));
    }

    #[test]
    fn test_concurrent_same_key_computes_once() {
        let cache: Arc<MemoCache<i64>> = Arc::new(MemoCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_compute(key(1), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(99)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_waiters_observe_failure() {
        let cache: Arc<MemoCache<i64, String>> = Arc::new(MemoCache::new());
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                cache.get_or_compute(key(1), || {
                    started.wait();
                    thread::sleep(Duration::from_millis(100));
                    Err("db down".to_string())
                })
            })
        };

        started.wait();
        let waiter = cache.get_or_compute_with_lookup(key(1), || Ok(1));
        assert_eq!(leader.join().unwrap(), Err("db down".to_string()));
        assert_eq!(waiter, Err("db down".to_string()));
        assert!(!cache.contains(&key(1)));
    }

    #[test]
    fn test_panic_releases_waiters() {
        let cache: Arc<MemoCache<i64>> = Arc::new(MemoCache::new());
        let started = Arc::new(Barrier::new(2));

        let leader = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                let _ = cache.get_or_compute(key(1), || {
                    started.wait();
                    thread::sleep(Duration::from_millis(100));
                    panic!("compute exploded");
                });
            })
        };

        started.wait();
        // The waiter is released when the leader unwinds and recomputes itself
        let result = cache.get_or_compute_with_lookup(key(1), || Ok(5));
        assert!(leader.join().is_err());
        assert_eq!(result, Ok((5, Lookup::Computed)));
        assert_eq!(cache.get(&key(1)), Some(5));
    }

    #[test]
    fn test_different_keys_do_not_block() {
        let cache: Arc<MemoCache<i64>> = Arc::new(MemoCache::new());
        let started = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let slow = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            let release = Arc::clone(&release);
            thread::spawn(move || {
                cache.get_or_compute(key(1), || {
                    started.wait();
                    release.wait();
                    Ok(1)
                })
            })
        };

        started.wait();
        // Key 1 is still computing; key 2 must complete regardless
        assert_eq!(cache.get_or_compute(key(2), || Ok(2)), Ok(2));
        assert!(!cache.contains(&key(1)));
        release.wait();
        assert_eq!(slow.join().unwrap(), Ok(1));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_clear_during_computation_keeps_in_flight_result() {
        let cache: Arc<MemoCache<i64>> = Arc::new(MemoCache::new());
        cache.get_or_compute(key(0), || Ok(0)).unwrap();
        let started = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let slow = {
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            let release = Arc::clone(&release);
            thread::spawn(move || {
                cache.get_or_compute(key(1), || {
                    started.wait();
                    release.wait();
                    Ok(1)
                })
            })
        };

        started.wait();
        cache.clear();
        assert!(!cache.contains(&key(0)));
        release.wait();
        assert_eq!(slow.join().unwrap(), Ok(1));
        assert!(cache.contains(&key(1)));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_eviction_hook_bounds_size() {
        let cache: MemoCache<i64> = MemoCache::builder().eviction(FifoLimit::new(2)).build();
        for n in 0..5 {
            cache.get_or_compute(key(n), || Ok(n)).unwrap();
        }
        assert_eq!(cache.size(), 2);
        assert!(cache.contains(&key(3)));
        assert!(cache.contains(&key(4)));
        assert!(!cache.contains(&key(0)));
    }

    /// Stores a key at the moment `clear` notifies the hook, the way a
    /// computation finishing alongside `clear` would.
    struct InsertDuringClear {
        inner: FifoLimit,
        cache: Arc<OnceCell<Weak<MemoCache<i64>>>>,
    }

    impl EvictionHook for InsertDuringClear {
        fn on_insert(&self, key: &CacheKey, store: &dyn EntryStore) {
            self.inner.on_insert(key, store);
        }

        fn on_clear(&self) {
            if let Some(cache) = self.cache.get().and_then(Weak::upgrade) {
                cache.insert_if_absent(key(100), 100);
            }
            self.inner.on_clear();
        }
    }

    #[test]
    fn test_bounded_cache_keeps_memoizing_after_racing_clear() {
        let slot = Arc::new(OnceCell::new());
        let cache: Arc<MemoCache<i64>> = Arc::new(
            MemoCache::builder()
                .eviction(InsertDuringClear {
                    inner: FifoLimit::new(1),
                    cache: Arc::clone(&slot),
                })
                .build(),
        );
        let _ = slot.set(Arc::downgrade(&cache));

        cache.get_or_compute(key(0), || Ok(0)).unwrap();
        cache.clear();
        assert_eq!(cache.size(), 0);

        for n in 1..4 {
            cache.get_or_compute(key(n), || Ok(n)).unwrap();
            assert!(cache.contains(&key(n)), "key {n} evicted on store");
            assert_eq!(cache.size(), 1);
        }
    }

    /// Counts hook notifications.
    struct CountingHook {
        inserts: Arc<AtomicUsize>,
    }

    impl EvictionHook for CountingHook {
        fn on_insert(&self, _key: &CacheKey, _store: &dyn EntryStore) {
            self.inserts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_hook_notified_only_for_stored_values() {
        let inserts = Arc::new(AtomicUsize::new(0));
        let cache: MemoCache<i64, String> = MemoCache::builder()
            .eviction(CountingHook {
                inserts: Arc::clone(&inserts),
            })
            .build();

        cache.get_or_compute(key(1), || Ok(1)).unwrap();
        cache.get_or_compute(key(1), || Ok(2)).unwrap();
        let _ = cache.get_or_compute(key(2), || Err("no".to_string()));
        assert!(cache.insert_if_absent(key(3), 3));
        assert!(!cache.insert_if_absent(key(3), 4));

        assert_eq!(inserts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.size(), 2);
    }

    #[cfg(feature = "stats")]
    #[test]
    fn test_stats_track_lookups() {
        let cache: MemoCache<i64, String> = MemoCache::new();
        cache.get_or_compute(key(1), || Ok(1)).unwrap();
        cache.get_or_compute(key(1), || Ok(1)).unwrap();
        let _ = cache.get_or_compute(key(2), || Err("no".to_string()));

        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 2);
        assert_eq!(cache.stats().failures(), 1);
    }

    #[test]
    fn test_builder_shards_and_name() {
        let cache: MemoCache<i64> = MemoCache::builder()
            .name("numbers")
            .shard_amount(4)
            .capacity(16)
            .build();
        assert_eq!(cache.name(), Some("numbers"));
        cache.get_or_compute(key(1), || Ok(1)).unwrap();
        assert!(format!("{cache:?}").contains("numbers"));
    }
}
