use std::sync::Arc;

use vpnlink_api::types::{DaemonEvent, TunnelState};
use vpnlink_api::{ConnectionObserver, Error};

use super::{Registration, daemon_event_subscription};
use crate::fetch::{SubscriptionCache, UpdateCallback};
use crate::source::DaemonSource;

/// Tunnel state, kept current by `daemon_event` pushes.
pub struct TunnelStateProxy {
    cache: SubscriptionCache<TunnelState>,
    observer: Arc<ConnectionObserver>,
    _registration: Registration,
}

impl TunnelStateProxy {
    pub fn new<R: DaemonSource>(source: R, on_update: UpdateCallback<TunnelState>) -> Self {
        let (listener, subscribe) =
            daemon_event_subscription(source.clone(), "tunnel_state", |event| match event {
                DaemonEvent::TunnelState(state) => Some(state),
                _ => None,
            });
        let fetch_source = source.clone();
        let cache = SubscriptionCache::new(
            move || {
                let source = fetch_source.clone();
                async move { source.get_state().await }
            },
            subscribe,
            on_update,
        );
        let observer = cache.auto_resubscribe(&source);
        let registration = Registration::new(source, Arc::clone(&observer), listener);
        Self {
            cache,
            observer,
            _registration: registration,
        }
    }

    pub async fn fetch(&self) -> Result<TunnelState, Error> {
        self.cache.fetch().await
    }

    /// Subscribe now, for a proxy created after the connection opened.
    pub fn handle_open(&self) {
        self.cache.handle_open();
    }

    pub fn is_subscribed(&self) -> bool {
        self.cache.is_subscribed()
    }

    pub fn value(&self) -> Option<TunnelState> {
        self.cache.value()
    }

    pub fn observer(&self) -> &Arc<ConnectionObserver> {
        &self.observer
    }
}
