//! Shared configuration for the vpnlink CLI.
//!
//! A single TOML file layered under `VPNLINK_` environment variables, plus
//! account token resolution (env + keyring + plaintext). Translates into the
//! `vpnlink_api` connection types; the CLI applies its flag overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vpnlink_api::{Endpoint, RpcTimeouts};

/// Prefix of every environment override. Nested keys use `__`, e.g.
/// `VPNLINK_TIMEOUTS__DEFAULT_MS`.
pub const ENV_PREFIX: &str = "VPNLINK_";

/// Environment variable holding the account token.
pub const ACCOUNT_TOKEN_ENV: &str = "VPNLINK_ACCOUNT_TOKEN";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "VPNLINK_CONFIG";

const KEYRING_SERVICE: &str = "vpnlink";
const KEYRING_ACCOUNT_TOKEN: &str = "account-token";

#[cfg(unix)]
pub const DEFAULT_ENDPOINT: &str = "/var/run/vpnlink/daemon.sock";
#[cfg(not(unix))]
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:49152";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no account token configured")]
    NoAccountToken,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Daemon socket path or `tcp://host:port`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Account token (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_token: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub cache: Cache,

    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            account_token: None,
            defaults: Defaults::default(),
            timeouts: Timeouts::default(),
            cache: Cache::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Output format: "plain", "json", "json-compact" or "yaml".
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

/// RPC timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Timeouts {
    #[serde(default = "default_timeout_ms")]
    pub default_ms: u64,

    /// Calls that make the daemon reach out to the API server.
    #[serde(default = "default_network_timeout_ms")]
    pub network_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: default_timeout_ms(),
            network_ms: default_network_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Cache {
    /// How long account data stays fresh, in seconds.
    #[serde(default = "default_account_data_secs")]
    pub account_data_secs: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            account_data_secs: default_account_data_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Log {
    #[serde(default)]
    pub format: LogFormat,

    /// `tracing` filter directive, used when neither `-v` nor `RUST_LOG` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_output() -> String {
    "plain".into()
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_network_timeout_ms() -> u64 {
    30_000
}
fn default_account_data_secs() -> u64 {
    60
}

impl Config {
    /// Parse the configured endpoint.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        self.endpoint
            .parse()
            .map_err(|e: vpnlink_api::transport::InvalidEndpoint| ConfigError::Validation {
                field: "endpoint".into(),
                reason: e.to_string(),
            })
    }

    pub fn rpc_timeouts(&self) -> RpcTimeouts {
        RpcTimeouts {
            default: Duration::from_millis(self.timeouts.default_ms),
            network: Duration::from_millis(self.timeouts.network_ms),
        }
    }

    pub fn account_data_max_age(&self) -> Duration {
        Duration::from_secs(self.cache.account_data_secs)
    }

    /// Reject values that would make every call fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;
        for (field, value) in [
            ("timeouts.default_ms", self.timeouts.default_ms),
            ("timeouts.network_ms", self.timeouts.network_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `VPNLINK_CONFIG`, then XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("net", "vpnlink", "vpnlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vpnlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layer defaults, the TOML file at `path` and `VPNLINK_` env vars.
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    config.validate()?;
    Ok(config)
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Render the config as it would be written to disk.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = to_toml(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

// ── Account token resolution ────────────────────────────────────────

/// Resolve the account token: env var, then system keyring, then plaintext
/// in the config.
pub fn resolve_account_token(cfg: &Config) -> Result<SecretString, ConfigError> {
    let from_keyring = || {
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT_TOKEN)
            .and_then(|entry| entry.get_password())
            .ok()
    };
    first_token(std::env::var(ACCOUNT_TOKEN_ENV).ok(), from_keyring, cfg)
}

fn first_token(
    env: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
    cfg: &Config,
) -> Result<SecretString, ConfigError> {
    env.filter(|t| !t.is_empty())
        .or_else(|| keyring().filter(|t| !t.is_empty()))
        .or_else(|| cfg.account_token.clone())
        .map(SecretString::from)
        .ok_or(ConfigError::NoAccountToken)
}

/// Store the account token in the system keyring.
pub fn store_account_token(token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT_TOKEN)?.set_password(token)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    #[test]
    fn defaults_match_daemon_expectations() {
        let cfg = Config::default();
        assert_eq!(cfg.rpc_timeouts(), RpcTimeouts::default());
        assert_eq!(cfg.account_data_max_age(), Duration::from_secs(60));
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn env_wins_over_keyring_and_plaintext() {
        let cfg = Config {
            account_token: Some("plain".into()),
            ..Config::default()
        };
        let token = first_token(Some("env".into()), || Some("ring".into()), &cfg).unwrap();
        assert_eq!(token.expose_secret(), "env");

        let token = first_token(None, || Some("ring".into()), &cfg).unwrap();
        assert_eq!(token.expose_secret(), "ring");

        let token = first_token(Some(String::new()), || None, &cfg).unwrap();
        assert_eq!(token.expose_secret(), "plain");
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = first_token(None, || None, &Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::NoAccountToken));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = Config::default();
        cfg.timeouts.network_ms = 0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid timeouts.network_ms: must be greater than zero");
    }

    #[cfg(unix)]
    #[test]
    fn endpoint_parses_socket_path_and_tcp() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.endpoint().unwrap(),
            Endpoint::Unix(PathBuf::from(DEFAULT_ENDPOINT))
        );
        cfg.endpoint = "tcp://127.0.0.1:5000".into();
        assert_eq!(cfg.endpoint().unwrap(), Endpoint::Tcp("127.0.0.1:5000".into()));
        cfg.endpoint = "tcp://nope".into();
        assert!(cfg.endpoint().is_err());
    }
}
