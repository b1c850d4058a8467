use serde::{Deserialize, Serialize};

use super::relay::RelayList;
use super::settings::Settings;
use super::tunnel::TunnelState;
use super::wireguard::KeygenEvent;

/// Payload of the multiplexed `daemon_event` push subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonEvent {
    TunnelState(TunnelState),
    Settings(Box<Settings>),
    RelayList(RelayList),
    WireguardKey(KeygenEvent),
}

impl DaemonEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TunnelState(_) => "tunnel_state",
            Self::Settings(_) => "settings",
            Self::RelayList(_) => "relay_list",
            Self::WireguardKey(_) => "wireguard_key",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn tagged_union_arms() {
        let event: DaemonEvent =
            serde_json::from_value(json!({"tunnel_state": {"state": "connecting"}})).unwrap();
        assert_eq!(event, DaemonEvent::TunnelState(TunnelState::Connecting(None)));
        assert_eq!(event.kind(), "tunnel_state");

        let event: DaemonEvent =
            serde_json::from_value(json!({"wireguard_key": "generation_failure"})).unwrap();
        assert_eq!(event, DaemonEvent::WireguardKey(KeygenEvent::GenerationFailure));
    }

    #[test]
    fn unknown_arm_is_rejected() {
        assert!(serde_json::from_value::<DaemonEvent>(json!({"app_upgrade": {}})).is_err());
        assert!(serde_json::from_value::<DaemonEvent>(json!({"tunnel_state": {"state": 3}})).is_err());
    }
}
