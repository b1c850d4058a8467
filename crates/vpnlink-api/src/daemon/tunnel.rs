// Tunnel endpoints
//
// Tunnel control and observation: connect/disconnect, state, and the
// current exit location.

use serde_json::json;
use tracing::info;

use crate::daemon::client::DaemonRpc;
use crate::error::Error;
use crate::types::{Location, TunnelState};

impl DaemonRpc {
    /// Ask the daemon to bring the tunnel up.
    ///
    /// `connect`
    pub async fn connect_tunnel(&self) -> Result<(), Error> {
        info!("requesting tunnel connect");
        self.invoke("connect", json!([])).await
    }

    /// `disconnect`
    pub async fn disconnect_tunnel(&self) -> Result<(), Error> {
        info!("requesting tunnel disconnect");
        self.invoke("disconnect", json!([])).await
    }

    /// `get_state`
    pub async fn get_state(&self) -> Result<TunnelState, Error> {
        self.call("get_state", json!([]), self.timeouts().default)
            .await
    }

    /// Geographic location of the current exit. `None` when the daemon
    /// could not determine it.
    ///
    /// `get_current_location`, network timeout.
    pub async fn get_location(&self) -> Result<Option<Location>, Error> {
        self.call("get_current_location", json!([]), self.timeouts().network)
            .await
    }
}
