use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use vpnlink_api::types::AccountData;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Presentation helper around an account's expiry timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountExpiry {
    expiry: DateTime<Utc>,
}

impl AccountExpiry {
    pub fn new(expiry: DateTime<Utc>) -> Self {
        Self { expiry }
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    pub fn has_expired(&self) -> bool {
        self.will_have_expired_at(Utc::now())
    }

    /// An account expires at its expiry instant, not after it.
    pub fn will_have_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.expiry <= at
    }

    /// Time left at `at`, or `None` once expired.
    pub fn remaining_at(&self, at: DateTime<Utc>) -> Option<Duration> {
        (self.expiry - at).to_std().ok().filter(|d| !d.is_zero())
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_at(Utc::now())
    }

    /// Remaining time rounded down to its largest unit, e.g. `"29days left"`.
    pub fn formatted_remaining_at(&self, at: DateTime<Utc>) -> String {
        let Some(remaining) = self.remaining_at(at) else {
            return "expired".to_owned();
        };
        let secs = remaining.as_secs();
        let unit = [DAY, HOUR, MINUTE]
            .into_iter()
            .find(|unit| secs >= *unit)
            .unwrap_or(1);
        let rounded = Duration::from_secs(secs - secs % unit);
        format!("{} left", humantime::format_duration(rounded))
    }

    pub fn formatted_remaining(&self) -> String {
        self.formatted_remaining_at(Utc::now())
    }

    /// Expiry in the local timezone.
    pub fn formatted_date(&self) -> String {
        self.expiry
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

impl From<&AccountData> for AccountExpiry {
    fn from(data: &AccountData) -> Self {
        Self::new(data.expiry)
    }
}

impl fmt::Display for AccountExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted_date())
    }
}
