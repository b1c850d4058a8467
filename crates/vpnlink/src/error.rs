//! CLI error types with miette diagnostics.
//!
//! Maps `vpnlink_api::Error` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vpnlink_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Daemon connection ────────────────────────────────────────────
    #[error("Could not connect to the daemon at {endpoint}")]
    #[diagnostic(
        code(vpnlink::daemon_unavailable),
        help(
            "Check that the daemon is running.\n\
             Override the socket with --endpoint or VPNLINK_ENDPOINT."
        )
    )]
    DaemonUnavailable {
        endpoint: String,
        #[source]
        source: vpnlink_api::Error,
    },

    #[error("Lost the connection to the daemon")]
    #[diagnostic(code(vpnlink::connection_lost))]
    ConnectionLost,

    #[error("The daemon did not respond in time")]
    #[diagnostic(
        code(vpnlink::timeout),
        help("Increase the timeout with --timeout or check that the daemon is healthy.")
    )]
    NoResponse,

    #[error("Timed out after {seconds}s waiting for {what}")]
    #[diagnostic(code(vpnlink::timeout))]
    Timeout { what: String, seconds: u64 },

    // ── Account ──────────────────────────────────────────────────────
    #[error("Invalid account")]
    #[diagnostic(
        code(vpnlink::invalid_account),
        help("Check the account token and log in again with: vpnlink account <TOKEN>")
    )]
    InvalidAccount,

    #[error("No account is logged in")]
    #[diagnostic(
        code(vpnlink::no_account),
        help(
            "Log in with: vpnlink account <TOKEN>\n\
             Or set VPNLINK_ACCOUNT_TOKEN."
        )
    )]
    NoAccount,

    // ── Daemon ───────────────────────────────────────────────────────
    #[error("The daemon could not reach the API server")]
    #[diagnostic(
        code(vpnlink::api_unreachable),
        help("Check your internet connection and try again.")
    )]
    ApiUnreachable,

    #[error("Invalid response from the daemon: {reason}")]
    #[diagnostic(
        code(vpnlink::invalid_response),
        help("The daemon may be running a different version than this CLI.")
    )]
    InvalidResponse { reason: String },

    #[error("Daemon error: {message}")]
    #[diagnostic(code(vpnlink::daemon_error))]
    Daemon { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vpnlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(vpnlink::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(vpnlink::config),
        help("Inspect the effective configuration with: vpnlink config show")
    )]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(vpnlink::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(vpnlink::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DaemonUnavailable { .. } | Self::ConnectionLost | Self::ApiUnreachable => {
                exit_code::CONNECTION
            }
            Self::NoResponse | Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::InvalidAccount | Self::NoAccount => exit_code::AUTH,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            Self::Config(err) if matches!(**err, ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoAccountToken => Self::NoAccount,
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── vpnlink_api::Error → CliError mapping ────────────────────────────

impl From<vpnlink_api::Error> for CliError {
    fn from(err: vpnlink_api::Error) -> Self {
        use vpnlink_api::Error;

        match err {
            Error::InvalidAccount => Self::InvalidAccount,
            Error::Communication => Self::ApiUnreachable,
            Error::NoDaemon => Self::NoResponse,
            Error::ConnectionClosed | Error::Io(_) => Self::ConnectionLost,
            Error::ResponseParse { method, cause } => Self::InvalidResponse {
                reason: format!("{method}: {cause}"),
            },
            Error::Protocol(reason) => Self::InvalidResponse { reason },
            Error::Internal { message } => Self::Daemon { message },
            Error::Remote { code, message } => Self::Daemon {
                message: format!("{message} (code {code})"),
            },
            Error::Cancelled => Self::Daemon {
                message: "operation cancelled".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_errors_exit_with_auth_code() {
        let err = CliError::from(vpnlink_api::Error::InvalidAccount);
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(CliError::from(ConfigError::NoAccountToken).exit_code(), exit_code::AUTH);
    }

    #[test]
    fn daemon_silence_is_a_timeout() {
        assert_eq!(
            CliError::from(vpnlink_api::Error::NoDaemon).exit_code(),
            exit_code::TIMEOUT
        );
        assert_eq!(
            CliError::from(vpnlink_api::Error::ConnectionClosed).exit_code(),
            exit_code::CONNECTION
        );
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "endpoint".into(),
            reason: "bad".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
