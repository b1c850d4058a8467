//! Typed payloads exchanged with the daemon.
//!
//! Every response and push is decoded into one of these types before it
//! reaches application code. Objects the daemon may extend accept unknown
//! fields; fixed-shape objects reject them with `deny_unknown_fields`.

mod account;
mod events;
mod location;
mod relay;
mod settings;
mod tunnel;
mod version;
mod wireguard;

pub use account::{AccountData, AccountToken};
pub use events::DaemonEvent;
pub use location::{Constraint, Location, LocationConstraint, TransportProtocol};
pub use relay::{
    ConnectionConfig, CustomTunnelEndpoint, NormalRelaySettings, NormalRelaySettingsUpdate,
    OpenVpnConstraints, OpenVpnEndpointData, ProtocolEndpoint, Relay, RelayBridges, RelayList,
    RelayListCity, RelayListCountry, RelaySettings, RelaySettingsUpdate, RelayTunnels,
    ShadowsocksEndpointData, TunnelConstraints, WireguardConstraints, WireguardEndpointData,
    WireguardPeer, WireguardTunnel,
};
pub use settings::{
    BridgeSettings, BridgeState, GenericTunnelOptions, OpenVpnTunnelOptions, ProxySettings,
    RemoteProxyAuth, Settings, TunnelOptions, WireguardTunnelOptions,
};
pub use tunnel::{
    AfterDisconnect, BlockReason, ConnectionDetails, ProxyEndpoint, ProxyType, TunnelEndpoint,
    TunnelState, TunnelType,
};
pub use version::AppVersionInfo;
pub use wireguard::{KeygenEvent, PublicKey};
