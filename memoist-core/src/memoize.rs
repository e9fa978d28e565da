use crate::cache::{Lookup, MemoCache};
use crate::error::{KeyError, MemoError};
use crate::key::{CacheKey, KeyDeriver};
use crate::value::Args;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A callable wrapped with memoization.
///
/// Created by [`memoize`]. Each call derives a key from the function
/// identifier and the arguments, then asks the shared [`MemoCache`] for it,
/// computing through the wrapped callable only on a miss. The wrapper keeps no
/// state of its own besides the identifier, the deriver and the cache handle.
pub struct Memoized<F, V, E = std::convert::Infallible> {
    function_id: String,
    deriver: KeyDeriver,
    cache: Arc<MemoCache<V, E>>,
    func: F,
}

/// Wraps `func` so that equal calls are computed once.
///
/// `function_id` must uniquely identify `func` among all callables sharing
/// `cache`; the caller owns that guarantee.
///
/// # Examples
///
/// ```
/// use memoist_core::{memoize, Args, MemoCache};
/// use std::convert::Infallible;
/// use std::sync::Arc;
///
/// let cache = Arc::new(MemoCache::new());
/// let add = memoize("add", Arc::clone(&cache), |args: &Args| {
///     let a = args.get(0).and_then(|v| v.as_int()).unwrap_or(0);
///     let b = args.get(1).and_then(|v| v.as_int()).unwrap_or(0);
///     Ok::<_, Infallible>(a + b)
/// });
///
/// assert_eq!(add.call(&Args::new().arg(2).arg(3)).unwrap(), 5);
/// assert_eq!(add.call(&Args::new().arg(2).arg(3)).unwrap(), 5);
/// assert_eq!(cache.size(), 1);
/// ```
pub fn memoize<F, V, E>(
    function_id: impl Into<String>,
    cache: Arc<MemoCache<V, E>>,
    func: F,
) -> Memoized<F, V, E>
where
    F: Fn(&Args) -> Result<V, E>,
{
    Memoized {
        function_id: function_id.into(),
        deriver: KeyDeriver::new(),
        cache,
        func,
    }
}

impl<F, V, E> Memoized<F, V, E>
where
    F: Fn(&Args) -> Result<V, E>,
    V: Clone,
    E: Clone,
{
    /// Calls the wrapped function through the cache.
    ///
    /// # Errors
    ///
    /// * [`MemoError::InvalidKey`] if the arguments cannot be canonicalized;
    ///   the wrapped function is not called
    /// * [`MemoError::ComputationFailed`] if the computation serving this
    ///   call failed
    pub fn call(&self, args: &Args) -> Result<V, MemoError<E>> {
        self.call_with_lookup(args).map(|(value, _)| value)
    }

    /// Like [`call`](Self::call), also reporting how the call was answered.
    pub fn call_with_lookup(&self, args: &Args) -> Result<(V, Lookup), MemoError<E>> {
        let key = self.key_for(args)?;
        let (value, lookup) = self
            .cache
            .get_or_compute_with_lookup(key, || (self.func)(args))
            .map_err(MemoError::ComputationFailed)?;
        trace!(function = %self.function_id, %key, ?lookup, "memoized call");
        Ok((value, lookup))
    }
}

impl<F, V, E> Memoized<F, V, E> {
    /// Replaces the key deriver, e.g. with a namespaced one.
    pub fn with_deriver(mut self, deriver: KeyDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    /// The key this wrapper uses for `args`.
    pub fn key_for(&self, args: &Args) -> Result<CacheKey, KeyError> {
        self.deriver.derive_args(&self.function_id, args)
    }

    pub fn function_id(&self) -> &str {
        &self.function_id
    }

    pub fn cache(&self) -> &Arc<MemoCache<V, E>> {
        &self.cache
    }
}

impl<F, V, E> fmt::Debug for Memoized<F, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("function_id", &self.function_id)
            .field("deriver", &self.deriver)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArgValue;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_call_computes_once() {
        let calls = AtomicUsize::new(0);
        let double = memoize("double", Arc::new(MemoCache::new()), |args: &Args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(args.get(0).and_then(ArgValue::as_int).unwrap_or(0) * 2)
        });

        assert_eq!(double.call(&Args::new().arg(21)), Ok(42));
        assert_eq!(double.call(&Args::new().arg(21)), Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsupported_argument_skips_computation() {
        let calls = AtomicUsize::new(0);
        let f = memoize("f", Arc::new(MemoCache::new()), |_: &Args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(0)
        });

        let set: HashSet<i32> = [1, 2].into_iter().collect();
        let err = f.call(&Args::new().arg(set)).unwrap_err();
        assert!(err.is_invalid_key());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.cache().size(), 0);
    }

    #[test]
    fn test_error_is_wrapped() {
        let f = memoize("fails", Arc::new(MemoCache::new()), |_: &Args| {
            Err::<i32, _>("nope".to_string())
        });
        assert_eq!(
            f.call(&Args::new()),
            Err(MemoError::ComputationFailed("nope".to_string()))
        );
    }

    #[test]
    fn test_shared_cache_separates_functions() {
        let cache = Arc::new(MemoCache::new());
        let inc = memoize("inc", Arc::clone(&cache), |args: &Args| {
            Ok::<_, String>(args.get(0).and_then(ArgValue::as_int).unwrap_or(0) + 1)
        });
        let dec = memoize("dec", Arc::clone(&cache), |args: &Args| {
            Ok::<_, String>(args.get(0).and_then(ArgValue::as_int).unwrap_or(0) - 1)
        });

        assert_eq!(inc.call(&Args::new().arg(10)), Ok(11));
        assert_eq!(dec.call(&Args::new().arg(10)), Ok(9));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_namespaced_deriver_changes_key() {
        let cache: Arc<MemoCache<i32>> = Arc::new(MemoCache::new());
        let plain = memoize("f", Arc::clone(&cache), |_: &Args| Ok(1));
        let scoped = memoize("f", Arc::clone(&cache), |_: &Args| Ok(2))
            .with_deriver(KeyDeriver::with_namespace("scoped"));

        let args = Args::new().arg(1);
        assert_ne!(plain.key_for(&args).unwrap(), scoped.key_for(&args).unwrap());
        assert_eq!(plain.call(&args), Ok(1));
        assert_eq!(scoped.call(&args), Ok(2));
        assert_eq!(plain.function_id(), "f");
    }

    #[test]
    fn test_call_with_lookup() {
        let f = memoize("id", Arc::new(MemoCache::new()), |args: &Args| {
            Ok::<_, String>(args.get(0).cloned())
        });
        let args = Args::new().arg("x");
        assert_eq!(f.call_with_lookup(&args).unwrap().1, Lookup::Computed);
        assert_eq!(f.call_with_lookup(&args).unwrap().1, Lookup::Hit);
    }
}
