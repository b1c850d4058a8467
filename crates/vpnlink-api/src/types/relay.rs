use serde::{Deserialize, Serialize};

use super::location::{Constraint, LocationConstraint, TransportProtocol};

// ── Relay settings ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaySettings {
    Normal(NormalRelaySettings),
    CustomTunnelEndpoint(CustomTunnelEndpoint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalRelaySettings {
    pub location: Constraint<LocationConstraint>,
    pub tunnel: Constraint<TunnelConstraints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelConstraints {
    Openvpn(OpenVpnConstraints),
    Wireguard(WireguardConstraints),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenVpnConstraints {
    pub port: Constraint<u16>,
    pub protocol: Constraint<TransportProtocol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireguardConstraints {
    pub port: Constraint<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTunnelEndpoint {
    pub host: String,
    pub config: ConnectionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionConfig {
    Openvpn {
        endpoint: ProtocolEndpoint,
        username: String,
        password: String,
    },
    Wireguard {
        tunnel: WireguardTunnel,
        peer: WireguardPeer,
        ipv4_gateway: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ipv6_gateway: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolEndpoint {
    pub address: String,
    pub protocol: TransportProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireguardTunnel {
    pub private_key: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireguardPeer {
    pub public_key: String,
    pub allowed_ips: Vec<String>,
    pub endpoint: String,
}

// ── Partial update ───────────────────────────────────────────────────

/// Outbound partial update for `update_relay_settings`. Unset fields are
/// omitted from the wire and left unchanged by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaySettingsUpdate {
    Normal(NormalRelaySettingsUpdate),
    CustomTunnelEndpoint(CustomTunnelEndpoint),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalRelaySettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Constraint<LocationConstraint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tunnel: Option<Constraint<TunnelConstraints>>,
}

// ── Relay list ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayList {
    pub countries: Vec<RelayListCountry>,
}

impl RelayList {
    /// Total number of relays across all countries and cities.
    pub fn relay_count(&self) -> usize {
        self.countries
            .iter()
            .flat_map(|country| &country.cities)
            .map(|city| city.relays.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayListCountry {
    pub name: String,
    pub code: String,
    pub cities: Vec<RelayListCity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayListCity {
    pub name: String,
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub relays: Vec<Relay>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub hostname: String,
    pub ipv4_addr_in: String,
    pub include_in_country: bool,
    pub weight: u64,
    #[serde(default)]
    pub bridges: Option<RelayBridges>,
    #[serde(default)]
    pub tunnels: Option<RelayTunnels>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBridges {
    pub shadowsocks: Vec<ShadowsocksEndpointData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShadowsocksEndpointData {
    pub port: u16,
    pub cipher: String,
    pub password: String,
    pub protocol: TransportProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayTunnels {
    pub openvpn: Vec<OpenVpnEndpointData>,
    pub wireguard: Vec<WireguardEndpointData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenVpnEndpointData {
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireguardEndpointData {
    /// Inclusive `(first, last)` port ranges.
    pub port_ranges: Vec<(u16, u16)>,
    pub public_key: String,
}
