use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use vpnlink_api::Error;

use super::coordinator::FetchCoordinator;
use super::lock;

#[derive(Debug, Clone, Copy)]
enum Expiration {
    At(Instant),
    Never,
}

struct CachedValue<T> {
    value: Option<T>,
    expiration: Expiration,
    /// Bumped by every `set_value` / `invalidate`.
    revision: u64,
}

impl<T> CachedValue<T> {
    fn has_expired(&self) -> bool {
        match self.expiration {
            Expiration::Never => false,
            Expiration::At(at) => at <= Instant::now(),
        }
    }
}

/// A single cached value in front of a [`FetchCoordinator`].
///
/// With `max_age: None` a stored value never expires until
/// [`invalidate`](Self::invalidate) is called. An expired value stays
/// readable through [`value`](Self::value) until a fetch replaces it.
pub struct FetchCache<T> {
    coordinator: FetchCoordinator<T>,
    max_age: Option<Duration>,
    state: Mutex<CachedValue<T>>,
}

impl<T> fmt::Debug for FetchCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("FetchCache")
            .field("max_age", &self.max_age)
            .field("has_value", &state.value.is_some())
            .field("expiration", &state.expiration)
            .finish_non_exhaustive()
    }
}

impl<T> FetchCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(fetch: F, max_age: Option<Duration>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self {
            coordinator: FetchCoordinator::new(fetch),
            max_age,
            state: Mutex::new(CachedValue {
                value: None,
                expiration: Expiration::At(Instant::now()),
                revision: 0,
            }),
        }
    }

    /// Return the cached value if it is still fresh, otherwise fetch.
    ///
    /// If a newer value is stored while the fetch is outstanding, that value
    /// wins over the one just fetched. A result that arrives after an
    /// [`invalidate`](Self::invalidate) is returned but not cached.
    pub async fn fetch(&self) -> Result<T, Error> {
        let revision = {
            let state = lock(&self.state);
            if let Some(value) = state.value.as_ref().filter(|_| !state.has_expired()) {
                return Ok(value.clone());
            }
            state.revision
        };

        let fetched = self.coordinator.fetch().await?;

        let mut state = lock(&self.state);
        if state.revision != revision {
            if let Some(newer) = &state.value {
                debug!("cache updated while fetching, keeping newer value");
                return Ok(newer.clone());
            }
            debug!("cache invalidated while fetching, not storing result");
            return Ok(fetched);
        }
        self.store(&mut state, fetched.clone());
        Ok(fetched)
    }

    pub fn set_value(&self, value: T) {
        let mut state = lock(&self.state);
        self.store(&mut state, value);
    }

    /// Drop the cached value and force the next fetch to go to the source.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        state.value = None;
        state.expiration = Expiration::At(Instant::now());
        state.revision += 1;
    }

    /// The last stored value, expired or not.
    pub fn value(&self) -> Option<T> {
        lock(&self.state).value.clone()
    }

    pub fn has_expired(&self) -> bool {
        lock(&self.state).has_expired()
    }

    pub fn coordinator(&self) -> &FetchCoordinator<T> {
        &self.coordinator
    }

    fn store(&self, state: &mut CachedValue<T>, value: T) {
        state.value = Some(value);
        state.expiration = match self.max_age {
            Some(age) => Expiration::At(Instant::now() + age),
            None => Expiration::Never,
        };
        state.revision += 1;
    }
}
