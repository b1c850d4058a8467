use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vpnlink_api::Error;

use super::{FetchFn, UpdateCallback, boxed_fetch, lock};

// ── Policy ───────────────────────────────────────────────────────────

/// Decision returned by a retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Stop,
    Retry { delay: Duration },
}

impl RetryAction {
    /// Retry immediately.
    pub const fn retry() -> Self {
        Self::Retry {
            delay: Duration::ZERO,
        }
    }

    pub const fn retry_after(delay: Duration) -> Self {
        Self::Retry { delay }
    }
}

/// Observes one retry session. Attempts are numbered from 1.
pub trait RetryWatcher<T>: Send + Sync {
    fn on_success(&self, attempt: u32, value: T);

    fn on_failure(&self, attempt: u32, error: &Error) -> RetryAction;
}

// ── FetchRetry ───────────────────────────────────────────────────────

struct Session<T> {
    id: u64,
    watcher: Arc<dyn RetryWatcher<T>>,
    cancel: CancellationToken,
}

struct Inner<T> {
    fetch: FetchFn<T>,
    session: Mutex<Option<Session<T>>>,
    next_session: AtomicU64,
}

impl<T> Inner<T> {
    /// The watcher of session `id`, if that session is still the active one.
    fn watcher(&self, id: u64) -> Option<Arc<dyn RetryWatcher<T>>> {
        lock(&self.session)
            .as_ref()
            .filter(|session| session.id == id)
            .map(|session| Arc::clone(&session.watcher))
    }

    fn finish(&self, id: u64) {
        let mut session = lock(&self.session);
        if session.as_ref().is_some_and(|s| s.id == id) {
            *session = None;
        }
    }
}

/// Runs a fetch repeatedly under a retry policy.
///
/// Only one session is active at a time. Starting a new session supersedes
/// the previous one: its pending timer is dropped and its late results are
/// never delivered to its watcher. Dropping the `FetchRetry` cancels the
/// active session.
pub struct FetchRetry<T> {
    inner: Arc<Inner<T>>,
}

impl<T> fmt::Debug for FetchRetry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRetry")
            .field("active", &lock(&self.inner.session).is_some())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for FetchRetry<T> {
    fn drop(&mut self) {
        let session = lock(&self.inner.session).take();
        if let Some(session) = session {
            session.cancel.cancel();
        }
    }
}

impl<T> FetchRetry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                fetch: boxed_fetch(fetch),
                session: Mutex::new(None),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Cancel any active session and start a new one at attempt 1.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_fetching(&self, watcher: Arc<dyn RetryWatcher<T>>) {
        self.cancel();

        let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        *lock(&self.inner.session) = Some(Session {
            id,
            watcher,
            cancel: cancel.clone(),
        });

        tokio::spawn(run_session(Arc::clone(&self.inner), id, cancel));
    }

    /// Make the active session inert.
    pub fn cancel(&self) {
        let session = lock(&self.inner.session).take();
        if let Some(session) = session {
            debug!(session = session.id, "cancelling retry session");
            session.cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.session).is_some()
    }

    /// Retry until the first success, or until `policy` says stop.
    ///
    /// Resolves with the first successful value, rejects with the error the
    /// policy stopped on. A superseded or cancelled session yields
    /// [`Error::Cancelled`].
    pub async fn fetch<P>(&self, policy: P) -> Result<T, Error>
    where
        P: Fn(u32, &Error) -> RetryAction + Send + Sync + 'static,
    {
        let (settle, outcome) = Settle::new();
        self.start_fetching(Arc::new(UntilSuccess { settle, policy }));
        outcome.await.unwrap_or(Err(Error::Cancelled))
    }

    /// Settle with the outcome of attempt 1 while continuing to retry in
    /// the background under `policy`.
    ///
    /// Every successful attempt, including later ones, is passed to
    /// `on_update`.
    pub async fn fetch_once<P>(&self, policy: P, on_update: UpdateCallback<T>) -> Result<T, Error>
    where
        P: Fn(u32, &Error) -> RetryAction + Send + Sync + 'static,
    {
        let (settle, outcome) = Settle::new();
        self.start_fetching(Arc::new(FirstAttempt {
            settle,
            policy,
            on_update,
        }));
        outcome.await.unwrap_or(Err(Error::Cancelled))
    }
}

async fn run_session<T>(inner: Arc<Inner<T>>, id: u64, cancel: CancellationToken)
where
    T: Send + Sync + 'static,
{
    let mut attempt: u32 = 1;
    loop {
        // In-flight work is never aborted; a superseded result is dropped below.
        let result = (inner.fetch)().await;

        let Some(watcher) = inner.watcher(id) else {
            debug!(session = id, attempt, "dropping result of superseded session");
            return;
        };

        let error = match result {
            Ok(value) => {
                watcher.on_success(attempt, value);
                inner.finish(id);
                return;
            }
            Err(error) => error,
        };

        let action = watcher.on_failure(attempt, &error);
        drop(watcher);

        if inner.watcher(id).is_none() {
            return;
        }

        match action {
            RetryAction::Stop => {
                debug!(session = id, attempt, error = %error, "retry policy stopped");
                inner.finish(id);
                return;
            }
            RetryAction::Retry { delay } => {
                debug!(session = id, attempt, delay_ms = delay.as_millis(), "scheduling retry");
                attempt = attempt.saturating_add(1);
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

// ── Built-in watchers ────────────────────────────────────────────────

/// Single-use completion slot for a watcher's outer caller.
struct Settle<T>(Mutex<Option<oneshot::Sender<Result<T, Error>>>>);

impl<T> Settle<T> {
    fn new() -> (Self, oneshot::Receiver<Result<T, Error>>) {
        let (tx, rx) = oneshot::channel();
        (Self(Mutex::new(Some(tx))), rx)
    }

    fn complete(&self, outcome: Result<T, Error>) {
        if let Some(tx) = lock(&self.0).take() {
            let _ = tx.send(outcome);
        }
    }
}

struct UntilSuccess<T, P> {
    settle: Settle<T>,
    policy: P,
}

impl<T, P> RetryWatcher<T> for UntilSuccess<T, P>
where
    T: Send,
    P: Fn(u32, &Error) -> RetryAction + Send + Sync,
{
    fn on_success(&self, _attempt: u32, value: T) {
        self.settle.complete(Ok(value));
    }

    fn on_failure(&self, attempt: u32, error: &Error) -> RetryAction {
        let action = (self.policy)(attempt, error);
        if action == RetryAction::Stop {
            self.settle.complete(Err(error.clone()));
        }
        action
    }
}

struct FirstAttempt<T, P> {
    settle: Settle<T>,
    policy: P,
    on_update: UpdateCallback<T>,
}

impl<T, P> RetryWatcher<T> for FirstAttempt<T, P>
where
    T: Clone + Send,
    P: Fn(u32, &Error) -> RetryAction + Send + Sync,
{
    fn on_success(&self, attempt: u32, value: T) {
        if attempt == 1 {
            self.settle.complete(Ok(value.clone()));
        }
        (self.on_update)(value);
    }

    fn on_failure(&self, attempt: u32, error: &Error) -> RetryAction {
        if attempt == 1 {
            self.settle.complete(Err(error.clone()));
        }
        (self.policy)(attempt, error)
    }
}
