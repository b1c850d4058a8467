// Settings endpoints
//
// Full settings snapshot, the individual toggles the daemon exposes, and
// version queries.

use serde_json::json;

use crate::daemon::client::DaemonRpc;
use crate::error::Error;
use crate::types::{AppVersionInfo, BridgeState, Settings};

impl DaemonRpc {
    /// `get_settings`
    pub async fn get_settings(&self) -> Result<Settings, Error> {
        self.call("get_settings", json!([]), self.timeouts().default)
            .await
    }

    /// `get_allow_lan`
    pub async fn get_allow_lan(&self) -> Result<bool, Error> {
        self.call("get_allow_lan", json!([]), self.timeouts().default)
            .await
    }

    /// `set_allow_lan`
    pub async fn set_allow_lan(&self, allow_lan: bool) -> Result<(), Error> {
        self.invoke("set_allow_lan", json!([allow_lan])).await
    }

    /// `set_enable_ipv6`
    pub async fn set_enable_ipv6(&self, enable_ipv6: bool) -> Result<(), Error> {
        self.invoke("set_enable_ipv6", json!([enable_ipv6])).await
    }

    /// `set_block_when_disconnected`
    pub async fn set_block_when_disconnected(&self, block: bool) -> Result<(), Error> {
        self.invoke("set_block_when_disconnected", json!([block]))
            .await
    }

    /// `set_bridge_state`
    pub async fn set_bridge_state(&self, state: BridgeState) -> Result<(), Error> {
        self.invoke("set_bridge_state", json!([state])).await
    }

    /// `set_openvpn_mssfix`. `None` restores the daemon default.
    pub async fn set_openvpn_mssfix(&self, mssfix: Option<u16>) -> Result<(), Error> {
        self.invoke("set_openvpn_mssfix", json!([mssfix])).await
    }

    /// `set_auto_connect`
    pub async fn set_auto_connect(&self, auto_connect: bool) -> Result<(), Error> {
        self.invoke("set_auto_connect", json!([auto_connect])).await
    }

    /// `get_current_version`
    pub async fn get_current_version(&self) -> Result<String, Error> {
        self.call("get_current_version", json!([]), self.timeouts().default)
            .await
    }

    /// Latest released versions and whether the running one is supported.
    ///
    /// `get_version_info`, network timeout.
    pub async fn get_version_info(&self) -> Result<AppVersionInfo, Error> {
        self.call("get_version_info", json!([]), self.timeouts().network)
            .await
    }
}
