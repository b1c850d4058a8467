// vpnlink-api: Async JSON-RPC client for a locally running VPN daemon

pub mod daemon;
pub mod error;
pub mod transport;
pub mod types;

pub use daemon::{ConnectionObserver, DaemonRpc, RpcTimeouts, SubscriptionListener};
pub use error::{Error, TransportError};
pub use transport::{ConnectionState, Endpoint, HandlerId, JsonRpcTransport, TransportEvent};
