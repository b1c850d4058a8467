//! CLI configuration: thin wrapper around `vpnlink_config`.
//!
//! Applies `GlobalOpts` flag overrides (--endpoint, --timeout, --output) on
//! top of the layered file + env configuration.

use clap::ValueEnum;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use vpnlink_config::{Config, ConfigError, config_path, resolve_account_token, save_config};

/// Load the config and apply CLI flag overrides. Flags win over env vars,
/// which win over the file.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    // Validation runs after the overrides so a flag can fix a bad file value.
    let mut cfg: Config = vpnlink_config::figment_for(&config_path())
        .extract()
        .map_err(ConfigError::from)?;

    if let Some(ref endpoint) = global.endpoint {
        cfg.endpoint.clone_from(endpoint);
    }

    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        let millis = secs.saturating_mul(1000);
        cfg.timeouts.default_ms = millis;
        cfg.timeouts.network_ms = cfg.timeouts.network_ms.max(millis);
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Output format: flag, then `defaults.output` from the config, then plain.
pub fn output_format(global: &GlobalOpts, cfg: Option<&Config>) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    let Some(name) = cfg.map(|c| c.defaults.output.as_str()) else {
        return Ok(OutputFormat::Plain);
    };
    OutputFormat::from_str(name, true).map_err(|_| CliError::Validation {
        field: "defaults.output".into(),
        reason: format!("expected plain, json, json-compact or yaml, got '{name}'"),
    })
}
