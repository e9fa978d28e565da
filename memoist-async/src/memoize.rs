use crate::AsyncMemoCache;
use memoist_core::{Args, CacheKey, KeyDeriver, KeyError, Lookup, MemoError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

/// An async callable wrapped with memoization. Created by [`memoize_async`].
pub struct AsyncMemoized<F, V, E = std::convert::Infallible> {
    function_id: String,
    deriver: KeyDeriver,
    cache: Arc<AsyncMemoCache<V, E>>,
    func: F,
}

/// Wraps an async function so that equal calls are computed once.
///
/// The function receives the call's [`Args`] by value, so the future it
/// returns can own them.
///
/// # Examples
///
/// ```
/// use memoist_async::{memoize_async, AsyncMemoCache};
/// use memoist_core::Args;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = Arc::new(AsyncMemoCache::new());
/// let fetch = memoize_async("fetch_len", Arc::clone(&cache), |args: Args| async move {
///     let s = args.get(0).and_then(|v| v.as_str()).unwrap_or_default().to_string();
///     Ok::<_, String>(s.len())
/// });
///
/// assert_eq!(fetch.call(Args::new().arg("hello")).await, Ok(5));
/// assert_eq!(fetch.call(Args::new().arg("hello")).await, Ok(5));
/// assert_eq!(cache.size(), 1);
/// # }
/// ```
pub fn memoize_async<F, Fut, V, E>(
    function_id: impl Into<String>,
    cache: Arc<AsyncMemoCache<V, E>>,
    func: F,
) -> AsyncMemoized<F, V, E>
where
    F: Fn(Args) -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    AsyncMemoized {
        function_id: function_id.into(),
        deriver: KeyDeriver::new(),
        cache,
        func,
    }
}

impl<F, Fut, V, E> AsyncMemoized<F, V, E>
where
    F: Fn(Args) -> Fut,
    Fut: Future<Output = Result<V, E>>,
    V: Clone,
    E: Clone,
{
    /// Calls the wrapped function through the cache.
    pub async fn call(&self, args: Args) -> Result<V, MemoError<E>> {
        self.call_with_lookup(args).await.map(|(value, _)| value)
    }

    pub async fn call_with_lookup(&self, args: Args) -> Result<(V, Lookup), MemoError<E>> {
        let key = self.key_for(&args)?;
        let (value, lookup) = self
            .cache
            .get_or_compute_with_lookup(key, || (self.func)(args))
            .await
            .map_err(MemoError::ComputationFailed)?;
        trace!(function = %self.function_id, %key, ?lookup, "memoized call");
        Ok((value, lookup))
    }
}

impl<F, V, E> AsyncMemoized<F, V, E> {
    pub fn with_deriver(mut self, deriver: KeyDeriver) -> Self {
        self.deriver = deriver;
        self
    }

    pub fn key_for(&self, args: &Args) -> Result<CacheKey, KeyError> {
        self.deriver.derive_args(&self.function_id, args)
    }

    pub fn function_id(&self) -> &str {
        &self.function_id
    }

    pub fn cache(&self) -> &Arc<AsyncMemoCache<V, E>> {
        &self.cache
    }
}

impl<F, V, E> fmt::Debug for AsyncMemoized<F, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMemoized")
            .field("function_id", &self.function_id)
            .field("deriver", &self.deriver)
            .field("cache", &self.cache)
            .finish()
    }
}
