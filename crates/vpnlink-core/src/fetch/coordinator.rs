use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vpnlink_api::Error;

use super::{FetchFn, boxed_fetch, lock};

struct InFlight<T> {
    id: u64,
    future: Shared<BoxFuture<'static, Result<T, Error>>>,
    detached: CancellationToken,
}

/// Collapses concurrent fetches into a single in-flight invocation.
///
/// Callers arriving while a fetch is outstanding join it and receive the
/// same result. [`cancel`](Self::cancel) detaches everyone currently
/// waiting: they get [`Error::Cancelled`] once the underlying work settles,
/// and the work itself is left to finish.
pub struct FetchCoordinator<T> {
    fetch: FetchFn<T>,
    in_flight: Mutex<Option<InFlight<T>>>,
    next_id: AtomicU64,
}

impl<T> fmt::Debug for FetchCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("fetching", &lock(&self.in_flight).is_some())
            .finish_non_exhaustive()
    }
}

impl<T> FetchCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self {
            fetch: boxed_fetch(fetch),
            in_flight: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Join the in-flight fetch, or start one.
    pub async fn fetch(&self) -> Result<T, Error> {
        let (id, future, detached) = {
            let mut slot = lock(&self.in_flight);
            if let Some(op) = slot.as_ref() {
                debug!(operation = op.id, "joining in-flight fetch");
                (op.id, op.future.clone(), op.detached.clone())
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let future = (self.fetch)().shared();
                let detached = CancellationToken::new();
                *slot = Some(InFlight {
                    id,
                    future: future.clone(),
                    detached: detached.clone(),
                });
                (id, future, detached)
            }
        };

        let result = future.await;

        if detached.is_cancelled() {
            debug!(operation = id, "discarding result of cancelled fetch");
            return Err(Error::Cancelled);
        }

        let mut slot = lock(&self.in_flight);
        if slot.as_ref().is_some_and(|op| op.id == id) {
            *slot = None;
        }
        result
    }

    /// Detach every caller of the in-flight fetch. Does not abort it.
    pub fn cancel(&self) {
        let op = lock(&self.in_flight).take();
        if let Some(op) = op {
            debug!(operation = op.id, "cancelling in-flight fetch");
            op.detached.cancel();
        }
    }

    pub fn is_fetching(&self) -> bool {
        lock(&self.in_flight).is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    /// Coordinator whose fetches block until released through the returned
    /// channel, counting invocations.
    fn gated() -> (
        Arc<FetchCoordinator<u32>>,
        Arc<AtomicUsize>,
        Arc<Mutex<Vec<oneshot::Sender<Result<u32, Error>>>>>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let gates: Arc<Mutex<Vec<oneshot::Sender<Result<u32, Error>>>>> =
            Arc::new(Mutex::new(Vec::new()));
        let coordinator = {
            let calls = Arc::clone(&calls);
            let gates = Arc::clone(&gates);
            FetchCoordinator::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let (tx, rx) = oneshot::channel();
                gates.lock().unwrap().push(tx);
                async move { rx.await.unwrap_or(Err(Error::ConnectionClosed)) }
            })
        };
        (Arc::new(coordinator), calls, gates)
    }

    fn release(gates: &Mutex<Vec<oneshot::Sender<Result<u32, Error>>>>, value: Result<u32, Error>) {
        let tx = gates.lock().unwrap().remove(0);
        tx.send(value).unwrap();
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_invocation() {
        let (coordinator, calls, gates) = gated();

        let callers: Vec<_> = (0..5)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.fetch().await })
            })
            .collect();
        tokio::task::yield_now().await;
        while gates.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(coordinator.is_fetching());

        release(&gates, Ok(7));
        for caller in callers {
            assert_eq!(caller.await.unwrap().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_fetching());
    }

    #[test]
    fn joined_caller_waits_for_the_first_invocation() {
        let (coordinator, calls, gates) = gated();

        let mut first = task::spawn(coordinator.fetch());
        let mut second = task::spawn(coordinator.fetch());
        assert_pending!(first.poll());
        assert_pending!(second.poll());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        release(&gates, Ok(3));
        assert!(first.is_woken());
        assert_eq!(assert_ready!(first.poll()).unwrap(), 3);
        assert_eq!(assert_ready!(second.poll()).unwrap(), 3);
    }

    #[tokio::test]
    async fn concurrent_callers_share_the_rejection() {
        let (coordinator, calls, gates) = gated();

        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.fetch().await }
        });
        let second = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.fetch().await }
        });
        while gates.lock().unwrap().is_empty() || !coordinator.is_fetching() {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        release(&gates, Err(Error::Communication));
        assert!(matches!(first.await.unwrap(), Err(Error::Communication)));
        assert!(matches!(second.await.unwrap(), Err(Error::Communication)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sequential_fetches_invoke_again() {
        let (coordinator, calls, gates) = gated();

        let first = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.fetch().await }
        });
        while gates.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        release(&gates, Ok(1));
        assert_eq!(first.await.unwrap().unwrap(), 1);

        let second = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.fetch().await }
        });
        while gates.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        release(&gates, Ok(2));
        assert_eq!(second.await.unwrap().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_discards_late_result() {
        let (coordinator, calls, gates) = gated();

        let stale = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.fetch().await }
        });
        while gates.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        coordinator.cancel();
        assert!(!coordinator.is_fetching());

        let fresh = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.fetch().await }
        });
        while gates.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }

        release(&gates, Ok(1));
        assert!(matches!(stale.await.unwrap(), Err(Error::Cancelled)));
        // The stale completion must not clear the fresh operation.
        assert!(coordinator.is_fetching());

        release(&gates, Ok(2));
        assert_eq!(fresh.await.unwrap().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
