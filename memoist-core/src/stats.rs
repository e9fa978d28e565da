use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring hit/miss rates.
///
/// Every `get_or_compute` call is counted exactly once, as one of:
///
/// * a **hit** - the value was already stored
/// * a **miss** - this caller ran the computation
/// * a **join** - another caller was already computing the value and this
///   caller waited for its outcome
///
/// Failed computations are additionally counted in `failures`.
///
/// # Thread Safety
///
/// All counters are atomics updated with `Relaxed` ordering.
///
/// # Examples
///
/// ```
/// use memoist_core::CacheStats;
///
/// let stats = CacheStats::new();
///
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
///
/// assert_eq!(stats.hits(), 2);
/// assert_eq!(stats.misses(), 1);
/// assert_eq!(stats.total_accesses(), 3);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    failures: AtomicU64,
}

impl CacheStats {
    /// Creates a new `CacheStats` instance with zero counters.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a caller that waited on an in-flight computation.
    #[inline]
    pub fn record_join(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the total number of cache accesses (hits + misses + joins).
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits() + self.misses() + self.joined()
    }

    /// Fraction of accesses that did not run a computation themselves
    /// (hits and joins). Returns 0.0 if there have been no accesses.
    ///
    /// # Examples
    ///
    /// ```
    /// use memoist_core::CacheStats;
    ///
    /// let stats = CacheStats::new();
    /// stats.record_miss();
    /// stats.record_join();
    /// stats.record_hit();
    /// stats.record_hit();
    ///
    /// assert!((stats.hit_rate() - 0.75).abs() < 0.001);
    /// ```
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            (self.hits() + self.joined()) as f64 / total as f64
        }
    }

    /// Calculates the miss rate as `1.0 - hit_rate()`.
    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Resets all statistics counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.joined.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.misses()),
            joined: AtomicU64::new(self.joined()),
            failures: AtomicU64::new(self.failures()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 0);
        assert_eq!(stats.joined(), 0);
        assert_eq!(stats.failures(), 0);
        assert_eq!(stats.total_accesses(), 0);
    }

    #[test]
    fn test_total_accesses_includes_joins() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_join();
        stats.record_failure();
        assert_eq!(stats.total_accesses(), 3);
        assert_eq!(stats.failures(), 1);
    }

    #[test]
    fn test_hit_rate_no_accesses() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 1.0);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_join();
        stats.record_failure();
        stats.reset();
        assert_eq!(stats.total_accesses(), 0);
        assert_eq!(stats.failures(), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let stats = CacheStats::new();
        stats.record_hit();

        let cloned = stats.clone();
        stats.record_hit();
        assert_eq!(stats.hits(), 2);
        assert_eq!(cloned.hits(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(CacheStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let stats_clone = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    stats_clone.record_hit();
                }
                for _ in 0..50 {
                    stats_clone.record_miss();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.hits(), 1000);
        assert_eq!(stats.misses(), 500);
        assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
    }
}
