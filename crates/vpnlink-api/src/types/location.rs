use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic location of the current exit, as seen by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    pub country: String,
    #[serde(default)]
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Whether traffic leaves through one of the provider's relays.
    #[serde(rename = "mullvad_exit_ip")]
    pub is_vpn_exit: bool,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub bridge_hostname: Option<String>,
}

// ── Constraints ──────────────────────────────────────────────────────

/// `"any"` or `{"only": value}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint<T> {
    Any,
    Only(T),
}

impl<T> Constraint<T> {
    pub fn as_only(&self) -> Option<&T> {
        match self {
            Self::Any => None,
            Self::Only(value) => Some(value),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Only(value) => value.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationConstraint {
    /// `[country, city, hostname]`
    Hostname(Vec<String>),
    /// `[country, city]`
    City(Vec<String>),
    Country(String),
}

impl fmt::Display for LocationConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hostname(parts) | Self::City(parts) => f.write_str(&parts.join("/")),
            Self::Country(code) => f.write_str(code),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportProtocol {
    Udp,
    Tcp,
}
