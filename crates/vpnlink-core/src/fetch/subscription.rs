use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};
use vpnlink_api::{ConnectionObserver, Error};

use super::UpdateCallback;
use super::cache::FetchCache;
use crate::source::DaemonSource;

/// Receives values pushed by the daemon.
pub type ValueSink<T> = Arc<dyn Fn(T) + Send + Sync>;

type SubscribeFn<T> = Arc<dyn Fn(ValueSink<T>) -> BoxFuture<'static, Result<(), Error>> + Send + Sync>;

struct Inner<T> {
    cache: FetchCache<T>,
    subscribe: SubscribeFn<T>,
    on_update: UpdateCallback<T>,
    /// Created once so the subscribe function always sees the same sink.
    sink: ValueSink<T>,
    generation: AtomicU64,
    subscribed: AtomicBool,
}

/// A [`FetchCache`] kept current by a daemon push subscription.
///
/// Every connection open resets the subscription: the cache is invalidated,
/// `subscribe` is called again, and once it completes one reconciling fetch
/// delivers whatever changed while the connection was down. Pushed values
/// replace the cached value and are forwarded to `on_update`.
pub struct SubscriptionCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SubscriptionCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for SubscriptionCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionCache")
            .field("subscribed", &self.inner.subscribed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl<T> SubscriptionCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut, S, SFut>(fetch: F, subscribe: S, on_update: UpdateCallback<T>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
        S: Fn(ValueSink<T>) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let subscribe: SubscribeFn<T> =
            Arc::new(move |sink| -> BoxFuture<'static, Result<(), Error>> { Box::pin(subscribe(sink)) });

        let inner = Arc::new_cyclic(|weak: &Weak<Inner<T>>| {
            let weak = weak.clone();
            let sink: ValueSink<T> = Arc::new(move |value: T| {
                if let Some(inner) = weak.upgrade() {
                    inner.cache.set_value(value.clone());
                    (inner.on_update)(value);
                }
            });
            Inner {
                cache: FetchCache::new(fetch, None),
                subscribe,
                on_update,
                sink,
                generation: AtomicU64::new(0),
                subscribed: AtomicBool::new(false),
            }
        });

        Self { inner }
    }

    /// Resubscribe every time the daemon connection opens.
    ///
    /// Returns the registered observer so the caller can remove it again.
    pub fn auto_resubscribe<R: DaemonSource>(&self, source: &R) -> Arc<ConnectionObserver> {
        let weak = Arc::downgrade(&self.inner);
        let observer = Arc::new(ConnectionObserver::new(
            move || {
                if let Some(inner) = weak.upgrade() {
                    Self::resubscribe(inner);
                }
            },
            |_| {},
        ));
        source.add_connection_observer(&observer);
        observer
    }

    /// React to a connection open event.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle_open(&self) {
        Self::resubscribe(Arc::clone(&self.inner));
    }

    pub async fn fetch(&self) -> Result<T, Error> {
        self.inner.cache.fetch().await
    }

    pub fn invalidate(&self) {
        self.inner.cache.invalidate();
    }

    /// Whether the subscription for the latest connection is in place.
    pub fn is_subscribed(&self) -> bool {
        self.inner.subscribed.load(Ordering::Acquire)
    }

    /// The last known value, if any.
    pub fn value(&self) -> Option<T> {
        self.inner.cache.value()
    }

    fn resubscribe(inner: Arc<Inner<T>>) {
        let generation = inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        inner.subscribed.store(false, Ordering::Release);
        inner.cache.invalidate();
        debug!(generation, "resubscribing after connection open");

        tokio::spawn(async move {
            if let Err(e) = (inner.subscribe)(Arc::clone(&inner.sink)).await {
                warn!(generation, error = %e, "failed to subscribe to daemon pushes");
                return;
            }

            if inner.generation.load(Ordering::Acquire) != generation {
                debug!(generation, "subscription superseded by a newer connection");
                return;
            }
            inner.subscribed.store(true, Ordering::Release);

            match inner.cache.fetch().await {
                Ok(value) => (inner.on_update)(value),
                Err(e) => warn!(generation, error = %e, "failed to reconcile after subscribing"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;

    use super::*;

    struct Harness {
        cache: SubscriptionCache<u32>,
        fetches: Arc<AtomicUsize>,
        subscribe_gates: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
        sinks: Arc<Mutex<Vec<ValueSink<u32>>>>,
        updates: Arc<Mutex<Vec<u32>>>,
    }

    fn harness() -> Harness {
        let fetches = Arc::new(AtomicUsize::new(0));
        let subscribe_gates: Arc<Mutex<Vec<oneshot::Sender<()>>>> = Arc::default();
        let sinks: Arc<Mutex<Vec<ValueSink<u32>>>> = Arc::default();
        let updates: Arc<Mutex<Vec<u32>>> = Arc::default();

        let cache = SubscriptionCache::new(
            {
                let fetches = Arc::clone(&fetches);
                move || {
                    let n = fetches.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(100 + u32::try_from(n).unwrap()) }
                }
            },
            {
                let gates = Arc::clone(&subscribe_gates);
                let sinks = Arc::clone(&sinks);
                move |sink| {
                    sinks.lock().unwrap().push(sink);
                    let (tx, rx) = oneshot::channel();
                    gates.lock().unwrap().push(tx);
                    async move { rx.await.map_err(|_| Error::ConnectionClosed) }
                }
            },
            {
                let updates = Arc::clone(&updates);
                Arc::new(move |value| updates.lock().unwrap().push(value))
            },
        );

        Harness {
            cache,
            fetches,
            subscribe_gates,
            sinks,
            updates,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn subscribe_then_reconcile() {
        let h = harness();
        h.cache.handle_open();
        settle().await;
        assert!(!h.cache.is_subscribed());

        h.subscribe_gates.lock().unwrap().remove(0).send(()).unwrap();
        settle().await;

        assert!(h.cache.is_subscribed());
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(*h.updates.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn pushes_update_cache_and_notify() {
        let h = harness();
        h.cache.handle_open();
        settle().await;
        h.subscribe_gates.lock().unwrap().remove(0).send(()).unwrap();
        settle().await;

        let sink = Arc::clone(&h.sinks.lock().unwrap()[0]);
        sink(7);

        assert_eq!(h.cache.fetch().await.unwrap(), 7);
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(*h.updates.lock().unwrap(), vec![100, 7]);
    }

    #[tokio::test]
    async fn reopen_before_subscribe_completes_is_serialized() {
        let h = harness();
        h.cache.handle_open();
        settle().await;
        h.cache.handle_open();
        settle().await;
        assert_eq!(h.subscribe_gates.lock().unwrap().len(), 2);

        // The superseded subscribe completes first: no flag, no fetch.
        h.subscribe_gates.lock().unwrap().remove(0).send(()).unwrap();
        settle().await;
        assert!(!h.cache.is_subscribed());
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);

        h.subscribe_gates.lock().unwrap().remove(0).send(()).unwrap();
        settle().await;
        assert!(h.cache.is_subscribed());
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_flag_cleared() {
        let h = harness();
        h.cache.handle_open();
        settle().await;
        drop(h.subscribe_gates.lock().unwrap().remove(0));
        settle().await;

        assert!(!h.cache.is_subscribed());
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn the_same_sink_is_passed_on_every_subscribe() {
        let h = harness();
        h.cache.handle_open();
        h.cache.handle_open();
        settle().await;

        let sinks = h.sinks.lock().unwrap();
        assert!(Arc::ptr_eq(&sinks[0], &sinks[1]));
    }
}
