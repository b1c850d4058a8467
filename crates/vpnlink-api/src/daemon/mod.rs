// Daemon RPC client
//
// `DaemonRpc` is split across files by method group. Each file adds
// inherent methods; `client` holds the shared call path.

pub mod account;
pub mod client;
pub mod events;
pub mod relays;
pub mod settings;
pub mod tunnel;
pub mod wireguard;

pub use client::{DaemonRpc, RpcTimeouts};
pub use events::{ConnectionObserver, SubscriptionListener};
