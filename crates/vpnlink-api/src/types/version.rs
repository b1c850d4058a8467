use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppVersionInfo {
    pub current_is_supported: bool,
    pub latest_stable: String,
    pub latest: String,
}
