use serde::{Deserialize, Serialize};

use super::account::AccountToken;
use super::location::{Constraint, LocationConstraint};
use super::relay::RelaySettings;

/// Full daemon settings snapshot, as returned by `get_settings` and pushed
/// through `daemon_event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub account_token: Option<AccountToken>,
    pub allow_lan: bool,
    pub auto_connect: bool,
    pub block_when_disconnected: bool,
    pub bridge_settings: BridgeSettings,
    pub bridge_state: BridgeState,
    pub relay_settings: RelaySettings,
    pub tunnel_options: TunnelOptions,
}

// ── Bridges ──────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BridgeState {
    On,
    #[default]
    Auto,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeSettings {
    Normal { location: Constraint<LocationConstraint> },
    Custom(Option<ProxySettings>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxySettings {
    Local {
        port: u16,
        peer: String,
    },
    Remote {
        address: String,
        #[serde(default)]
        auth: Option<RemoteProxyAuth>,
    },
    Shadowsocks {
        peer: String,
        password: String,
        cipher: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProxyAuth {
    pub username: String,
    pub password: String,
}

// ── Tunnel options ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelOptions {
    pub openvpn: OpenVpnTunnelOptions,
    pub wireguard: WireguardTunnelOptions,
    pub generic: GenericTunnelOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenVpnTunnelOptions {
    #[serde(default)]
    pub mssfix: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireguardTunnelOptions {
    #[serde(default)]
    pub mtu: Option<u16>,
    /// Firewall mark, Linux only. The daemon spells it `fmwark`.
    #[serde(default, rename = "fmwark")]
    pub fwmark: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericTunnelOptions {
    pub enable_ipv6: bool,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn settings_json() -> serde_json::Value {
        json!({
            "account_token": "1234567890",
            "allow_lan": false,
            "auto_connect": true,
            "block_when_disconnected": false,
            "bridge_settings": {"normal": {"location": "any"}},
            "bridge_state": "auto",
            "relay_settings": {"normal": {"location": "any", "tunnel": "any"}},
            "tunnel_options": {
                "openvpn": {"mssfix": null},
                "wireguard": {"mtu": 1380, "fmwark": 78},
                "generic": {"enable_ipv6": true}
            }
        })
    }

    #[test]
    fn decodes_full_settings() {
        let settings: Settings = serde_json::from_value(settings_json()).unwrap();
        assert_eq!(settings.account_token.as_deref(), Some("1234567890"));
        assert_eq!(settings.bridge_state, BridgeState::Auto);
        assert_eq!(settings.tunnel_options.wireguard.fwmark, Some(78));
        assert!(settings.tunnel_options.generic.enable_ipv6);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let mut value = settings_json();
        value.as_object_mut().unwrap().remove("allow_lan");
        assert!(serde_json::from_value::<Settings>(value).is_err());
    }

    #[test]
    fn custom_bridge_with_shadowsocks_proxy() {
        let bridge: BridgeSettings = serde_json::from_value(json!({
            "custom": {"shadowsocks": {"peer": "1.2.3.4:443", "password": "p", "cipher": "aes-256-gcm"}}
        }))
        .unwrap();
        assert!(matches!(
            bridge,
            BridgeSettings::Custom(Some(ProxySettings::Shadowsocks { .. }))
        ));
    }

    #[test]
    fn bridge_state_parses_case_insensitively() {
        assert_eq!("ON".parse::<BridgeState>().unwrap(), BridgeState::On);
        assert_eq!(BridgeState::Off.to_string(), "off");
        assert!("sometimes".parse::<BridgeState>().is_err());
    }
}
