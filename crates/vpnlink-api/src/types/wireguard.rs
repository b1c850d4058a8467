use serde::{Deserialize, Serialize};

/// Base64-encoded WireGuard public key.
pub type PublicKey = String;

/// Outcome of a key generation request, also pushed as `wireguard_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeygenEvent {
    NewKey(PublicKey),
    TooManyKeys,
    GenerationFailure,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn string_and_object_forms() {
        assert_eq!(
            serde_json::from_value::<KeygenEvent>(json!("too_many_keys")).unwrap(),
            KeygenEvent::TooManyKeys
        );
        assert_eq!(
            serde_json::from_value::<KeygenEvent>(json!({"new_key": "abc="})).unwrap(),
            KeygenEvent::NewKey("abc=".into())
        );
        assert!(serde_json::from_value::<KeygenEvent>(json!("new_key")).is_err());
    }
}
