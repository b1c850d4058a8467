use std::sync::Arc;

use vpnlink_api::types::{DaemonEvent, Settings};
use vpnlink_api::{ConnectionObserver, Error};

use super::{Registration, daemon_event_subscription};
use crate::fetch::{SubscriptionCache, UpdateCallback};
use crate::source::DaemonSource;

/// Daemon settings, kept current by `daemon_event` pushes.
pub struct SettingsProxy {
    cache: SubscriptionCache<Settings>,
    observer: Arc<ConnectionObserver>,
    _registration: Registration,
}

impl SettingsProxy {
    /// Create the proxy and register it to resubscribe on every connection open.
    pub fn new<R: DaemonSource>(source: R, on_update: UpdateCallback<Settings>) -> Self {
        let (listener, subscribe) =
            daemon_event_subscription(source.clone(), "settings", |event| match event {
                DaemonEvent::Settings(settings) => Some(*settings),
                _ => None,
            });
        let fetch_source = source.clone();
        let cache = SubscriptionCache::new(
            move || {
                let source = fetch_source.clone();
                async move { source.get_settings().await }
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

    pub async fn fetch(&self) -> Result<Settings, Error> {
        self.cache.fetch().await
    }

    /// Subscribe now, for a proxy created after the connection opened.
    pub fn handle_open(&self) {
        self.cache.handle_open();
    }

    pub fn is_subscribed(&self) -> bool {
        self.cache.is_subscribed()
    }

    pub fn value(&self) -> Option<Settings> {
        self.cache.value()
    }

    /// The connection observer registered on the source.
    pub fn observer(&self) -> &Arc<ConnectionObserver> {
        &self.observer
    }
}
