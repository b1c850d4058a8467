mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vpnlink_api::DaemonRpc;
use vpnlink_config::{Log, LogFormat};

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = config::load(&cli.global);
    init_tracing(
        cli.global.verbose,
        cli.global.quiet,
        cfg.as_ref().ok().map(|c| &c.log),
    );

    if let Err(err) = run(cli, cfg).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, quiet: bool, log: Option<&Log>) {
    let level = match verbosity {
        0 if quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directive = match log.and_then(|l| l.filter.as_deref()) {
        Some(filter) if verbosity == 0 => filter,
        _ => level,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if log.is_some_and(|l| l.format == LogFormat::Json) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, cfg: Result<config::Config, CliError>) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without a daemon, and some without a valid config
        Command::Config(args) => commands::config_cmd::handle(args, cfg, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "vpnlink", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = cfg?;
            let rpc = connect(&cfg).await?;
            let ctx = Context::new(rpc.clone(), cfg, &cli.global)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &ctx).await;
            rpc.disconnect();
            result
        }
    }
}

/// Open the daemon connection described by the config.
async fn connect(cfg: &config::Config) -> Result<DaemonRpc, CliError> {
    let endpoint = cfg.endpoint()?;
    let rpc = DaemonRpc::new(cfg.rpc_timeouts());
    rpc.connect(&endpoint)
        .await
        .map_err(|source| CliError::DaemonUnavailable {
            endpoint: endpoint.to_string(),
            source,
        })?;
    Ok(rpc)
}
