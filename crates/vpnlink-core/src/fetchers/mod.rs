// ── Resource fetchers ──
//
// Per-resource compositions of the fetch primitives. Each fetcher owns its
// own cache / coordinator / retry state; nothing is shared between them.

mod account;
mod expiry;
mod location;
mod settings;
mod tunnel_state;

use std::sync::{Arc, OnceLock};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};
use vpnlink_api::types::DaemonEvent;
use vpnlink_api::{ConnectionObserver, Error, SubscriptionListener};

pub use account::{ACCOUNT_DATA_MAX_AGE, AccountDataFetcher, account_retry_policy};
pub use expiry::AccountExpiry;
pub use location::{LocationFetcher, location_retry_policy};
pub use settings::SettingsProxy;
pub use tunnel_state::TunnelStateProxy;

use crate::fetch::ValueSink;
use crate::source::DaemonSource;

type DaemonEventListener = Arc<SubscriptionListener<DaemonEvent>>;

/// Holds the `daemon_event` listener once the first subscribe created it.
pub(crate) type ListenerSlot = Arc<OnceLock<DaemonEventListener>>;

/// Build a subscribe function for [`SubscriptionCache`](crate::SubscriptionCache)
/// that feeds one arm of `daemon_event` into the cache.
///
/// The listener is created on first use and reused afterwards, so
/// resubscribing after a reconnect never registers it twice. The returned
/// slot gives the owner access to it for unregistering.
pub(crate) fn daemon_event_subscription<R, T>(
    source: R,
    resource: &'static str,
    select: fn(DaemonEvent) -> Option<T>,
) -> (
    ListenerSlot,
    impl Fn(ValueSink<T>) -> BoxFuture<'static, Result<(), Error>> + Send + Sync + 'static,
)
where
    R: DaemonSource,
    T: Send + 'static,
{
    let slot: ListenerSlot = Arc::default();
    let listener = Arc::clone(&slot);
    let subscribe = move |sink: ValueSink<T>| -> BoxFuture<'static, Result<(), Error>> {
        let listener = Arc::clone(listener.get_or_init(|| {
            Arc::new(SubscriptionListener::new(
                move |event| {
                    if let Some(value) = select(event) {
                        sink(value);
                    }
                },
                move |error: Error| warn!(resource, error = %error, "dropping invalid daemon event"),
            ))
        }));
        let source = source.clone();
        Box::pin(async move { source.subscribe_daemon_event_listener(&listener).await })
    };
    (slot, subscribe)
}

/// Unregisters a proxy's connection observer and event listener from its
/// source when dropped.
pub(crate) struct Registration {
    release: Box<dyn Fn() + Send + Sync>,
}

impl Registration {
    pub(crate) fn new<R: DaemonSource>(
        source: R,
        observer: Arc<ConnectionObserver>,
        listener: ListenerSlot,
    ) -> Self {
        Self {
            release: Box::new(move || {
                source.remove_connection_observer(&observer);
                if let Some(listener) = listener.get() {
                    source.remove_event_listener(listener);
                }
            }),
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        debug!("releasing daemon event registrations");
        (self.release)();
    }
}
