// Account endpoints
//
// Account data lookup (network-bound), the active account token, and the
// daemon's history of previously used tokens.

use serde_json::{Value, json};
use tracing::debug;

use crate::daemon::client::DaemonRpc;
use crate::error::Error;
use crate::types::{AccountData, AccountToken};

impl DaemonRpc {
    /// Fetch expiry information for `token` from the API server.
    ///
    /// `get_account_data`. Uses the network timeout since the daemon waits
    /// on an HTTP request before replying. An unknown token yields
    /// [`Error::InvalidAccount`].
    pub async fn get_account_data(&self, token: &str) -> Result<AccountData, Error> {
        debug!("fetching account data");
        self.call("get_account_data", Value::from(token), self.timeouts().network)
            .await
    }

    /// The account token the daemon is configured with, if any.
    ///
    /// `get_account`
    pub async fn get_account(&self) -> Result<Option<AccountToken>, Error> {
        self.call("get_account", json!([]), self.timeouts().default)
            .await
    }

    /// `set_account`. `None` logs the daemon out.
    pub async fn set_account(&self, token: Option<&str>) -> Result<(), Error> {
        self.invoke("set_account", json!([token])).await
    }

    /// `get_account_history`
    pub async fn get_account_history(&self) -> Result<Vec<AccountToken>, Error> {
        self.call("get_account_history", json!([]), self.timeouts().default)
            .await
    }

    /// `remove_account_from_history`
    pub async fn remove_account_from_history(&self, token: &str) -> Result<(), Error> {
        self.invoke("remove_account_from_history", Value::from(token))
            .await
    }
}
