use std::time::Duration;

use tracing::warn;
use vpnlink_api::Error;
use vpnlink_api::types::Location;

use crate::fetch::{FetchRetry, RetryAction};
use crate::source::DaemonSource;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Linear backoff of 500ms per attempt, capped at 30s. Never gives up.
pub fn location_retry_policy(attempt: u32, error: &Error) -> RetryAction {
    warn!(attempt, error = %error, "failed to fetch location");
    let delay = Duration::from_millis(500)
        .checked_mul(attempt)
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY));
    RetryAction::retry_after(delay)
}

/// Current exit location, retried until the daemon answers.
pub struct LocationFetcher {
    retries: FetchRetry<Option<Location>>,
}

impl LocationFetcher {
    pub fn new<R: DaemonSource>(source: R) -> Self {
        Self {
            retries: FetchRetry::new(move || {
                let source = source.clone();
                async move { source.get_location().await }
            }),
        }
    }

    /// Resolves with the first successful answer. A concurrent call
    /// supersedes this one, which then fails with [`Error::Cancelled`].
    pub async fn fetch(&self) -> Result<Option<Location>, Error> {
        self.retries.fetch(location_retry_policy).await
    }

    pub fn cancel(&self) {
        self.retries.cancel();
    }
}
