use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque account number used to authenticate against the API server.
pub type AccountToken = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    /// Moment the account runs out of paid time.
    pub expiry: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn decodes_rfc3339_expiry_and_ignores_extra_fields() {
        let data: AccountData = serde_json::from_value(serde_json::json!({
            "expiry": "2026-11-01T12:00:00Z",
            "unrelated": true
        }))
        .unwrap();
        assert_eq!(data.expiry, Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn rejects_non_date_expiry() {
        let result = serde_json::from_value::<AccountData>(serde_json::json!({"expiry": 5}));
        assert!(result.is_err());
    }
}
