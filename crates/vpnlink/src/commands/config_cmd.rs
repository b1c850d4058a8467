//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Copy of the config that is safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    if cfg.account_token.is_some() {
        cfg.account_token = Some("****".into());
    }
    cfg
}

fn render_toml(cfg: &Config) -> String {
    vpnlink_config::to_toml(cfg).map_or_else(
        |e| format!("# failed to render config: {e}"),
        |text| text.trim_end().to_owned(),
    )
}

pub fn handle(
    args: ConfigArgs,
    cfg: Result<Config, CliError>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redacted(&cfg?);
            let format = config::output_format(global, Some(&cfg))?;
            let out = output::render_single(format, &cfg, render_toml)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let path = config::save_config(&Config::default())?;
            output::note(
                &format!("Configuration written to {}", path.display()),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "account token cannot be empty".into(),
                });
            }
            vpnlink_config::store_account_token(token.trim())?;
            output::note("Account token stored in system keyring", global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_masked() {
        let cfg = Config {
            account_token: Some("1234567890".into()),
            ..Config::default()
        };
        let text = render_toml(&redacted(&cfg));
        assert!(text.contains("account_token = \"****\""));
        assert!(!text.contains("1234567890"));
    }
}
