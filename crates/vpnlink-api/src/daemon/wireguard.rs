// WireGuard key endpoints

use serde_json::json;

use crate::daemon::client::DaemonRpc;
use crate::error::Error;
use crate::types::{KeygenEvent, PublicKey};

impl DaemonRpc {
    /// `generate_wireguard_key`
    pub async fn generate_wireguard_key(&self) -> Result<KeygenEvent, Error> {
        self.call("generate_wireguard_key", json!([]), self.timeouts().default)
            .await
    }

    /// `get_wireguard_key`
    pub async fn get_wireguard_key(&self) -> Result<Option<PublicKey>, Error> {
        self.call("get_wireguard_key", json!([]), self.timeouts().default)
            .await
    }

    /// Whether the daemon's key is still registered with the API server.
    ///
    /// `verify_wireguard_key`
    pub async fn verify_wireguard_key(&self) -> Result<bool, Error> {
        self.call("verify_wireguard_key", json!([]), self.timeouts().default)
            .await
    }
}
