//! Client-side fetch layer for the vpnlink daemon.
//!
//! Sits between the UI and [`vpnlink_api::DaemonRpc`]:
//!
//! - [`fetch::FetchCoordinator`] joins concurrent fetches into one in-flight call
//! - [`fetch::FetchCache`] serves a value until it expires
//! - [`fetch::FetchRetry`] re-runs a fetch under a caller-supplied retry policy
//! - [`fetch::SubscriptionCache`] keeps a cache fed by daemon pushes across reconnects
//!
//! The [`fetchers`] module composes these per daemon resource.

pub mod fetch;
pub mod fetchers;
pub mod source;

pub use fetch::{
    FetchCache, FetchCoordinator, FetchRetry, RetryAction, RetryWatcher, SubscriptionCache,
    UpdateCallback, ValueSink,
};
pub use fetchers::{
    AccountDataFetcher, AccountExpiry, LocationFetcher, SettingsProxy, TunnelStateProxy,
};
pub use source::DaemonSource;
pub use vpnlink_api::Error;
