// ── Daemon source ──
//
// The slice of `DaemonRpc` the fetchers depend on. Kept as a trait so that
// fetchers can be driven by an in-memory double in tests.

use std::future::Future;
use std::sync::Arc;

use vpnlink_api::types::{AccountData, DaemonEvent, Location, Settings, TunnelState};
use vpnlink_api::{ConnectionObserver, DaemonRpc, Error, SubscriptionListener};

pub trait DaemonSource: Clone + Send + Sync + 'static {
    fn get_account_data(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<AccountData, Error>> + Send;

    fn get_location(&self) -> impl Future<Output = Result<Option<Location>, Error>> + Send;

    fn get_settings(&self) -> impl Future<Output = Result<Settings, Error>> + Send;

    fn get_state(&self) -> impl Future<Output = Result<TunnelState, Error>> + Send;

    fn subscribe_daemon_event_listener(
        &self,
        listener: &Arc<SubscriptionListener<DaemonEvent>>,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn add_connection_observer(&self, observer: &Arc<ConnectionObserver>);

    fn remove_connection_observer(&self, observer: &Arc<ConnectionObserver>);

    /// Returns `false` if the listener was not registered.
    fn remove_event_listener(&self, listener: &Arc<SubscriptionListener<DaemonEvent>>) -> bool;
}

impl DaemonSource for DaemonRpc {
    fn get_account_data(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<AccountData, Error>> + Send {
        DaemonRpc::get_account_data(self, token)
    }

    fn get_location(&self) -> impl Future<Output = Result<Option<Location>, Error>> + Send {
        DaemonRpc::get_location(self)
    }

    fn get_settings(&self) -> impl Future<Output = Result<Settings, Error>> + Send {
        DaemonRpc::get_settings(self)
    }

    fn get_state(&self) -> impl Future<Output = Result<TunnelState, Error>> + Send {
        DaemonRpc::get_state(self)
    }

    fn subscribe_daemon_event_listener(
        &self,
        listener: &Arc<SubscriptionListener<DaemonEvent>>,
    ) -> impl Future<Output = Result<(), Error>> + Send {
        DaemonRpc::subscribe_daemon_event_listener(self, listener)
    }

    fn add_connection_observer(&self, observer: &Arc<ConnectionObserver>) {
        DaemonRpc::add_connection_observer(self, observer);
    }

    fn remove_connection_observer(&self, observer: &Arc<ConnectionObserver>) {
        DaemonRpc::remove_connection_observer(self, observer);
    }

    fn remove_event_listener(&self, listener: &Arc<SubscriptionListener<DaemonEvent>>) -> bool {
        DaemonRpc::remove_event_listener(self, listener)
    }
}
