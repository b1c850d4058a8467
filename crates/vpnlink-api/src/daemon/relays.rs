// Relay endpoints
//
// Relay list and relay selection settings.

use serde_json::json;

use crate::daemon::client::DaemonRpc;
use crate::error::Error;
use crate::types::{RelayList, RelaySettings, RelaySettingsUpdate};

impl DaemonRpc {
    /// `get_relay_locations`
    pub async fn get_relay_locations(&self) -> Result<RelayList, Error> {
        self.call("get_relay_locations", json!([]), self.timeouts().default)
            .await
    }

    /// `get_relay_settings`
    pub async fn get_relay_settings(&self) -> Result<RelaySettings, Error> {
        self.call("get_relay_settings", json!([]), self.timeouts().default)
            .await
    }

    /// Apply a partial relay settings update. Fields left unset are kept.
    ///
    /// `update_relay_settings`
    pub async fn update_relay_settings(&self, update: &RelaySettingsUpdate) -> Result<(), Error> {
        let update = serde_json::to_value(update).map_err(|e| Error::Protocol(e.to_string()))?;
        self.invoke("update_relay_settings", json!([update])).await
    }
}
