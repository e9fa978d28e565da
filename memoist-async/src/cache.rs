use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use memoist_core::{CacheKey, EntryStore, EvictionHook, Lookup};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::watch;
use tracing::{debug, trace};

#[cfg(feature = "stats")]
use memoist_core::CacheStats;

type Outcome<V, E> = Option<Result<V, E>>;

enum Slot<V, E> {
    Ready(V),
    Pending {
        flight: u64,
        rx: watch::Receiver<Outcome<V, E>>,
    },
}

/// Async counterpart of [`MemoCache`](memoist_core::MemoCache).
///
/// The contract is the same: at most one computation per key runs at a
/// time, errors are handed to every waiter and never stored, and misses on
/// different keys never wait for each other. The differences are:
///
/// - `compute` is a future, and callers waiting on an in-flight key are
///   suspended instead of blocking their thread
/// - if the computing future is dropped before it completes (its task was
///   cancelled or panicked), the in-progress mark is removed and waiters retry
///
/// # Examples
///
/// ```
/// use memoist_async::AsyncMemoCache;
/// use memoist_core::{KeyDeriver, Lookup};
/// use std::convert::Infallible;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache: AsyncMemoCache<u64, Infallible> = AsyncMemoCache::new();
/// let key = KeyDeriver::new().derive("fetch", &[7.into()], &[]).unwrap();
///
/// let (v, lookup) = cache
///     .get_or_compute_with_lookup(key, || async { Ok(49) })
///     .await
///     .unwrap();
/// assert_eq!((v, lookup), (49, Lookup::Computed));
///
/// let v = cache.get_or_compute(key, || async { Ok(0) }).await.unwrap();
/// assert_eq!(v, 49);
/// # }
/// ```
pub struct AsyncMemoCache<V, E = std::convert::Infallible> {
    name: Option<String>,
    slots: DashMap<CacheKey, Slot<V, E>>,
    stored: AtomicUsize,
    next_flight: AtomicU64,
    eviction: Option<Box<dyn EvictionHook>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<V, E> AsyncMemoCache<V, E> {
    pub fn new() -> Self {
        AsyncMemoCacheBuilder::new().build()
    }

    pub fn builder() -> AsyncMemoCacheBuilder<V, E> {
        AsyncMemoCacheBuilder::new()
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

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots
            .get(key)
            .map(|slot| matches!(*slot, Slot::Ready(_)))
            .unwrap_or(false)
    }

    /// Removes every stored entry. In-flight computations are left running
    /// and store their result when they finish.
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
            Slot::Pending { .. } => true,
        });
        self.stored.fetch_sub(removed, Ordering::AcqRel);
        debug!(cache = self.label(), removed, "cache cleared");
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("memo-async")
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

    fn release(&self, key: &CacheKey, flight: u64) {
        self.slots.remove_if(key, |_, slot| {
            matches!(slot, Slot::Pending { flight: f, .. } if *f == flight)
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

impl<V: Clone, E: Clone> AsyncMemoCache<V, E> {
    /// Returns the value stored for `key`, awaiting `compute()` on a miss.
    ///
    /// # Errors
    ///
    /// Returns the error of the computation that served this call. Errors are
    /// never stored.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_compute_with_lookup(key, compute)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute), also reporting whether
    /// the call was a hit, a computation, or a join.
    pub async fn get_or_compute_with_lookup<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<(V, Lookup), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let (flight, tx) = loop {
            let mut rx = match self.slots.entry(key) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Ready(value) => {
                        let value = value.clone();
                        self.record(Lookup::Hit);
                        trace!(cache = self.label(), %key, "hit");
                        return Ok((value, Lookup::Hit));
                    }
                    Slot::Pending { rx, .. } => rx.clone(),
                },
                Entry::Vacant(entry) => {
                    let flight = self.next_flight.fetch_add(1, Ordering::Relaxed);
                    let (tx, rx) = watch::channel(None);
                    entry.insert(Slot::Pending { flight, rx });
                    break (flight, tx);
                }
            };

            trace!(cache = self.label(), %key, "joining in-flight computation");
            // A closed channel means the computing future was dropped
            let outcome = match rx.wait_for(Option::is_some).await {
                Ok(outcome) => outcome.clone(),
                Err(_) => None,
            };
            match outcome {
                Some(Ok(value)) => {
                    self.record(Lookup::Joined);
                    return Ok((value, Lookup::Joined));
                }
                Some(Err(err)) => {
                    self.record(Lookup::Joined);
                    return Err(err);
                }
                None => {
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
            tx: Some(tx),
        };
        let result = compute().await;
        guard.finish(result).map(|value| (value, Lookup::Computed))
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.slots.get(key).and_then(|slot| match &*slot {
            Slot::Ready(value) => Some(value.clone()),
            Slot::Pending { .. } => None,
        })
    }

    /// Stores `value` unless `key` is already stored or being computed.
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
    fn install(&self, key: CacheKey, flight: u64, value: &V) -> bool {
        match self.slots.get_mut(&key) {
            Some(mut slot) if matches!(&*slot, Slot::Pending { flight: f, .. } if *f == flight) => {
                *slot = Slot::Ready(value.clone());
                self.stored.fetch_add(1, Ordering::AcqRel);
                true
            }
            _ => false,
        }
    }
}

impl<V, E> Default for AsyncMemoCache<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for AsyncMemoCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoCache")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("eviction", &self.eviction.is_some())
            .finish()
    }
}

/// Owns the sending side of an in-flight computation. Dropping it without
/// `finish` (cancellation or panic) removes the in-progress mark and closes
/// the channel, which makes waiters retry.
struct FlightGuard<'a, V: Clone, E: Clone> {
    cache: &'a AsyncMemoCache<V, E>,
    key: CacheKey,
    flight: u64,
    tx: Option<watch::Sender<Outcome<V, E>>>,
}

impl<V: Clone, E: Clone> FlightGuard<'_, V, E> {
    fn finish(mut self, result: Result<V, E>) -> Result<V, E> {
        let cache = self.cache;
        let tx = self.tx.take();
        let stored = match &result {
            Ok(value) => cache.install(self.key, self.flight, value),
            Err(_) => {
                cache.release(&self.key, self.flight);
                #[cfg(feature = "stats")]
                cache.stats.record_failure();
                debug!(cache = cache.label(), key = %self.key, "computation failed, nothing stored");
                false
            }
        };
        if let Some(tx) = tx {
            tx.send_replace(Some(result.clone()));
        }
        if stored {
            cache.evict_after_insert(&self.key);
        }
        result
    }
}

impl<V: Clone, E: Clone> Drop for FlightGuard<'_, V, E> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            self.cache.release(&self.key, self.flight);
            debug!(cache = self.cache.label(), key = %self.key, "computation dropped, releasing waiters");
        }
    }
}

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

/// Builder for [`AsyncMemoCache`].
pub struct AsyncMemoCacheBuilder<V, E = std::convert::Infallible> {
    name: Option<String>,
    capacity: usize,
    eviction: Option<Box<dyn EvictionHook>>,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E> AsyncMemoCacheBuilder<V, E> {
    pub fn new() -> Self {
        Self {
            name: None,
            capacity: 0,
            eviction: None,
            _marker: PhantomData,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn eviction(mut self, hook: impl EvictionHook + 'static) -> Self {
        self.eviction = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> AsyncMemoCache<V, E> {
        AsyncMemoCache {
            name: self.name,
            slots: DashMap::with_capacity(self.capacity),
            stored: AtomicUsize::new(0),
            next_flight: AtomicU64::new(0),
            eviction: self.eviction,
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }
}

impl<V, E> Default for AsyncMemoCacheBuilder<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> fmt::Debug for AsyncMemoCacheBuilder<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoCacheBuilder")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("eviction", &self.eviction.is_some())
            .finish()
    }
}
