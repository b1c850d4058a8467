use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::location::{Location, TransportProtocol};

// ── Tunnel state ─────────────────────────────────────────────────────

/// State of the daemon's tunnel state machine.
///
/// On the wire this is `{"state": ..., "details": ...}` where the shape of
/// `details` depends on `state`. Decoding goes through [`RawTunnelState`]
/// and an exhaustive match so that a mismatched pairing is a decode error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTunnelState")]
pub enum TunnelState {
    Disconnected,
    Connecting(Option<ConnectionDetails>),
    Connected(Option<ConnectionDetails>),
    Disconnecting(AfterDisconnect),
    Blocked(BlockReason),
}

impl TunnelState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting(_) => "connecting",
            Self::Connected(_) => "connected",
            Self::Disconnecting(_) => "disconnecting",
            Self::Blocked(_) => "blocked",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn details(&self) -> Option<&ConnectionDetails> {
        match self {
            Self::Connecting(details) | Self::Connected(details) => details.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnecting(after) => write!(f, "disconnecting ({after})"),
            Self::Blocked(reason) => write!(f, "blocked ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTunnelState {
    state: String,
    #[serde(default)]
    details: Option<Value>,
}

impl TryFrom<RawTunnelState> for TunnelState {
    type Error = String;

    fn try_from(raw: RawTunnelState) -> Result<Self, Self::Error> {
        fn details<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, String> {
            serde_json::from_value(value).map_err(|e| e.to_string())
        }

        match (raw.state.as_str(), raw.details) {
            ("disconnected", None) => Ok(Self::Disconnected),
            ("connecting", d) => d.map(details::<ConnectionDetails>).transpose().map(Self::Connecting),
            ("connected", d) => d.map(details::<ConnectionDetails>).transpose().map(Self::Connected),
            ("disconnecting", Some(d)) => details(d).map(Self::Disconnecting),
            ("blocked", Some(d)) => details(d).map(Self::Blocked),
            ("disconnected", Some(_)) => Err("unexpected details for state `disconnected`".into()),
            ("disconnecting" | "blocked", None) => {
                Err(format!("missing details for state `{}`", raw.state))
            }
            (other, _) => Err(format!("unknown tunnel state `{other}`")),
        }
    }
}

impl Serialize for TunnelState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TunnelState", 2)?;
        state.serialize_field("state", self.name())?;
        match self {
            Self::Disconnected | Self::Connecting(None) | Self::Connected(None) => {
                state.skip_field("details")?;
            }
            Self::Connecting(Some(details)) | Self::Connected(Some(details)) => {
                state.serialize_field("details", details)?;
            }
            Self::Disconnecting(after) => state.serialize_field("details", after)?,
            Self::Blocked(reason) => state.serialize_field("details", reason)?,
        }
        state.end()
    }
}

// ── Details ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionDetails {
    pub endpoint: TunnelEndpoint,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelEndpoint {
    pub address: String,
    pub protocol: TransportProtocol,
    pub tunnel_type: TunnelType,
    #[serde(default)]
    pub proxy: Option<ProxyEndpoint>,
}

impl fmt::Display for TunnelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} over {}", self.tunnel_type, self.address, self.protocol)?;
        if let Some(proxy) = &self.proxy {
            write!(f, " via {} {}", proxy.proxy_type, proxy.address)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub address: String,
    pub protocol: TransportProtocol,
    pub proxy_type: ProxyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TunnelType {
    Wireguard,
    Openvpn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProxyType {
    Shadowsocks,
    Custom,
}

/// What the daemon does once the current disconnect completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AfterDisconnect {
    Nothing,
    Block,
    Reconnect,
}

// ── Block reasons ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBlockReason")]
pub enum BlockReason {
    Ipv6Unavailable,
    SetFirewallPolicyError,
    SetDnsError,
    StartTunnelError,
    NoMatchingRelay,
    IsOffline,
    TapAdapterProblem,
    AuthFailed(Option<String>),
}

impl BlockReason {
    fn code(&self) -> &'static str {
        match self {
            Self::Ipv6Unavailable => "ipv6_unavailable",
            Self::SetFirewallPolicyError => "set_firewall_policy_error",
            Self::SetDnsError => "set_dns_error",
            Self::StartTunnelError => "start_tunnel_error",
            Self::NoMatchingRelay => "no_matching_relay",
            Self::IsOffline => "is_offline",
            Self::TapAdapterProblem => "tap_adapter_problem",
            Self::AuthFailed(_) => "auth_failed",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthFailed(Some(details)) => write!(f, "auth_failed: {details}"),
            other => f.write_str(other.code()),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBlockReason {
    reason: String,
    #[serde(default)]
    details: Option<String>,
}

impl TryFrom<RawBlockReason> for BlockReason {
    type Error = String;

    fn try_from(raw: RawBlockReason) -> Result<Self, Self::Error> {
        let reason = match raw.reason.as_str() {
            "auth_failed" => return Ok(Self::AuthFailed(raw.details)),
            "ipv6_unavailable" => Self::Ipv6Unavailable,
            "set_firewall_policy_error" => Self::SetFirewallPolicyError,
            "set_dns_error" => Self::SetDnsError,
            "start_tunnel_error" => Self::StartTunnelError,
            "no_matching_relay" => Self::NoMatchingRelay,
            "is_offline" => Self::IsOffline,
            "tap_adapter_problem" => Self::TapAdapterProblem,
            other => return Err(format!("unknown block reason `{other}`")),
        };
        if raw.details.is_some() {
            return Err(format!("unexpected details for block reason `{}`", raw.reason));
        }
        Ok(reason)
    }
}

impl Serialize for BlockReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut reason = serializer.serialize_struct("BlockReason", 2)?;
        reason.serialize_field("reason", self.code())?;
        match self {
            Self::AuthFailed(Some(details)) => reason.serialize_field("details", details)?,
            _ => reason.skip_field("details")?,
        }
        reason.end()
    }
}
