use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Remote error codes the daemon is known to return.
pub mod codes {
    /// Account does not exist (API server).
    pub const ACCOUNT_DOES_NOT_EXIST: i64 = -200;
    /// JSON-RPC internal error, used by the daemon for failed API calls.
    pub const JSONRPC_INTERNAL: i64 = -32603;
    /// Internal daemon error (older daemons).
    pub const INTERNAL: i64 = -10000;
    /// Unknown API server error (older daemons).
    pub const API_SERVER: i64 = -10100;
    /// Communication with the API server failed (older daemons).
    pub const API_COMMUNICATION: i64 = -10101;
    /// Account does not exist (older daemons).
    pub const INVALID_ACCOUNT: i64 = -10200;
}

// ── Transport-level errors ──────────────────────────────────────────

/// Failure of a single JSON-RPC exchange, before any translation.
///
/// `Clone` so that one failure can be fanned out to every caller that
/// joined the same in-flight request.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The daemon answered with a JSON-RPC error object.
    #[error("remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// No response arrived within the requested timeout.
    #[error("{method} timed out after {}ms", timeout.as_millis())]
    Timeout { method: String, timeout: Duration },

    /// The connection closed while the request was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// `send` was called without an open connection.
    #[error("not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// A frame that could not be encoded or understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

// ── Client-facing error taxonomy ────────────────────────────────────

/// Top-level error type for the `vpnlink-api` crate.
///
/// Transport failures are translated into this taxonomy exactly once, at
/// the [`DaemonRpc`](crate::DaemonRpc) boundary. Layers above propagate it
/// unchanged.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Account ─────────────────────────────────────────────────────
    /// The account token is unknown to the API server.
    #[error("Invalid account")]
    InvalidAccount,

    // ── Daemon reachability ─────────────────────────────────────────
    /// The daemon could not talk to the API server.
    #[error("Failed to communicate with the API server")]
    Communication,

    /// The daemon did not answer (timeout or no connection).
    #[error("The daemon is not available")]
    NoDaemon,

    /// The connection closed while the call was outstanding.
    #[error("Connection to the daemon was closed")]
    ConnectionClosed,

    // ── Data ────────────────────────────────────────────────────────
    /// A response or push payload did not match its declared shape.
    #[error("Invalid response from {method}: {cause}")]
    ResponseParse {
        method: String,
        #[source]
        cause: Arc<serde_json::Error>,
    },

    // ── Remote ──────────────────────────────────────────────────────
    /// Known daemon-side failure without a more specific meaning.
    #[error("{message}")]
    Internal { message: String },

    /// Unrecognized remote error, passed through untouched.
    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },

    // ── Local ───────────────────────────────────────────────────────
    /// A coordinated fetch was cancelled or a retry session superseded.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub(crate) fn response_parse(method: &str, cause: serde_json::Error) -> Self {
        Self::ResponseParse {
            method: method.to_owned(),
            cause: Arc::new(cause),
        }
    }

    /// Returns `true` if the daemon rejected the account token.
    pub fn is_invalid_account(&self) -> bool {
        matches!(self, Self::InvalidAccount)
    }

    /// Returns `true` if retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Communication | Self::NoDaemon | Self::ConnectionClosed | Self::Io(_)
        )
    }

    /// The remote error code, for errors passed through untranslated.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Remote { code, message } => match code {
                codes::ACCOUNT_DOES_NOT_EXIST | codes::INVALID_ACCOUNT => Self::InvalidAccount,
                codes::JSONRPC_INTERNAL | codes::API_COMMUNICATION => Self::Communication,
                codes::INTERNAL => Self::Internal {
                    message: "Unexpected internal error".into(),
                },
                codes::API_SERVER => Self::Internal {
                    message: "Unexpected API server error".into(),
                },
                _ => Self::Remote { code, message },
            },
            TransportError::Timeout { .. } | TransportError::NotConnected => Self::NoDaemon,
            TransportError::ConnectionClosed => Self::ConnectionClosed,
            TransportError::Io(e) => Self::Io(e),
            TransportError::Protocol(msg) => Self::Protocol(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(code: i64) -> TransportError {
        TransportError::Remote {
            code,
            message: "boom".into(),
        }
    }

    #[test]
    fn account_codes_map_to_invalid_account() {
        assert!(Error::from(remote(-200)).is_invalid_account());
        assert!(Error::from(remote(-10200)).is_invalid_account());
    }

    #[test]
    fn communication_codes_map_to_communication() {
        assert!(matches!(Error::from(remote(-32603)), Error::Communication));
        assert!(matches!(Error::from(remote(-10101)), Error::Communication));
    }

    #[test]
    fn internal_codes_carry_a_message() {
        let err = Error::from(remote(-10000));
        assert_eq!(err.to_string(), "Unexpected internal error");

        let err = Error::from(remote(-10100));
        assert_eq!(err.to_string(), "Unexpected API server error");
    }

    #[test]
    fn unknown_codes_pass_through() {
        let err = Error::from(remote(-42));
        assert_eq!(err.remote_code(), Some(-42));
        assert!(!err.is_transient());
    }

    #[test]
    fn timeout_means_no_daemon() {
        let err = Error::from(TransportError::Timeout {
            method: "get_state".into(),
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(err, Error::NoDaemon));
        assert!(err.is_transient());
    }
}
