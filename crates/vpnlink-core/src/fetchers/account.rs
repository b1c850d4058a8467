use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;
use vpnlink_api::Error;
use vpnlink_api::types::{AccountData, AccountToken};

use crate::fetch::{FetchCache, FetchRetry, RetryAction, UpdateCallback};
use crate::source::DaemonSource;

/// How long fetched account data is served from cache.
pub const ACCOUNT_DATA_MAX_AGE: Duration = Duration::from_secs(60);

/// Upper bound on the delay between account data retries, in seconds.
const MAX_RETRY_DELAY_SECS: u64 = 2048;

/// Stop on an unknown account, otherwise back off exponentially:
/// 8s, 16s, 32s, ... capped at 2048s.
pub fn account_retry_policy(attempt: u32, error: &Error) -> RetryAction {
    if error.is_invalid_account() {
        return RetryAction::Stop;
    }
    let secs = 1_u64
        .checked_shl(attempt.saturating_add(2))
        .unwrap_or(u64::MAX)
        .min(MAX_RETRY_DELAY_SECS);
    RetryAction::retry_after(Duration::from_secs(secs))
}

/// Account expiry data, cached for [`ACCOUNT_DATA_MAX_AGE`] and retried in
/// the background.
///
/// `fetch` settles with the first attempt's outcome; later successful
/// retries are delivered through `on_update`.
pub struct AccountDataFetcher {
    current_account: Arc<Mutex<Option<AccountToken>>>,
    cache: Arc<FetchCache<AccountData>>,
    retries: FetchRetry<AccountData>,
    on_update: UpdateCallback<AccountData>,
}

impl AccountDataFetcher {
    pub fn new<R: DaemonSource>(source: R, on_update: UpdateCallback<AccountData>) -> Self {
        Self::with_max_age(source, ACCOUNT_DATA_MAX_AGE, on_update)
    }

    pub fn with_max_age<R: DaemonSource>(
        source: R,
        max_age: Duration,
        on_update: UpdateCallback<AccountData>,
    ) -> Self {
        let current_account: Arc<Mutex<Option<AccountToken>>> = Arc::default();

        let cache = Arc::new(FetchCache::new(
            {
                let current_account = Arc::clone(&current_account);
                move || {
                    let token = crate::fetch::lock(&current_account)
                        .clone()
                        .unwrap_or_default();
                    let source = source.clone();
                    async move { source.get_account_data(&token).await }
                }
            },
            Some(max_age),
        ));

        let retries = FetchRetry::new({
            let cache = Arc::clone(&cache);
            move || {
                let cache = Arc::clone(&cache);
                async move { cache.fetch().await }
            }
        });

        Self {
            current_account,
            cache,
            retries,
            on_update,
        }
    }

    /// Fetch account data for `token`. Switching to a different token drops
    /// the cached data, the in-flight request and any retries for the
    /// previous one.
    pub async fn fetch(&self, token: &str) -> Result<AccountData, Error> {
        let switched = {
            let mut current = crate::fetch::lock(&self.current_account);
            if current.as_deref() == Some(token) {
                false
            } else {
                *current = Some(token.to_owned());
                true
            }
        };
        if switched {
            debug!("account changed, invalidating account data");
            self.invalidate();
        }

        self.retries
            .fetch_once(account_retry_policy, Arc::clone(&self.on_update))
            .await
    }

    /// Cancel retries, detach any in-flight request and drop cached data.
    pub fn invalidate(&self) {
        self.retries.cancel();
        self.cache.coordinator().cancel();
        self.cache.invalidate();
    }

    pub fn cached(&self) -> Option<AccountData> {
        self.cache.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(action: RetryAction) -> Duration {
        match action {
            RetryAction::Retry { delay } => delay,
            RetryAction::Stop => panic!("expected retry"),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(delay(account_retry_policy(1, &Error::NoDaemon)), Duration::from_secs(8));
        assert_eq!(delay(account_retry_policy(2, &Error::NoDaemon)), Duration::from_secs(16));
        assert_eq!(delay(account_retry_policy(9, &Error::NoDaemon)), Duration::from_secs(2048));
        assert_eq!(
            delay(account_retry_policy(u32::MAX, &Error::Communication)),
            Duration::from_secs(2048)
        );
    }

    #[test]
    fn invalid_account_stops() {
        assert_eq!(account_retry_policy(1, &Error::InvalidAccount), RetryAction::Stop);
    }
}
