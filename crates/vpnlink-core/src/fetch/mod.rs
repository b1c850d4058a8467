// ── Fetch primitives ──
//
// Generic building blocks: in-flight deduplication, expiring cache,
// policy-driven retries and push-fed subscription caches.

mod cache;
mod coordinator;
mod retry;
mod subscription;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use vpnlink_api::Error;

pub use cache::FetchCache;
pub use coordinator::FetchCoordinator;
pub use retry::{FetchRetry, RetryAction, RetryWatcher};
pub use subscription::{SubscriptionCache, ValueSink};

/// Invoked with every value a fetcher delivers to the UI.
pub type UpdateCallback<T> = Arc<dyn Fn(T) + Send + Sync>;

pub(crate) type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, Error>> + Send + Sync>;

pub(crate) fn boxed_fetch<T, F, Fut>(fetch: F) -> FetchFn<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<'static, Result<T, Error>> { Box::pin(fetch()) })
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
