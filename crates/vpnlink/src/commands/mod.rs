//! Command dispatch: bridges CLI args -> daemon calls -> output formatting.

pub mod account;
pub mod config_cmd;
pub mod events;
pub mod location;
pub mod relays;
pub mod settings;
pub mod tunnel;
pub mod version;

use vpnlink_api::DaemonRpc;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Everything a daemon-bound handler needs.
pub struct Context {
    pub rpc: DaemonRpc,
    pub config: Config,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Context {
    pub fn new(rpc: DaemonRpc, config: Config, global: &GlobalOpts) -> Result<Self, CliError> {
        let output = config::output_format(global, Some(&config))?;
        Ok(Self {
            rpc,
            config,
            output,
            color: output == OutputFormat::Plain && output::should_color(global.color),
            quiet: global.quiet,
        })
    }

    pub fn print(&self, rendered: &str) {
        output::print_output(rendered, self.quiet);
    }

    pub fn note(&self, message: &str) {
        output::note(message, self.quiet);
    }
}

/// Dispatch a daemon-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Status => tunnel::status(ctx).await,
        Command::Connect(args) => tunnel::connect(ctx, &args).await,
        Command::Disconnect => tunnel::disconnect(ctx).await,
        Command::Account(args) => account::handle(ctx, args).await,
        Command::Location(args) => location::handle(ctx, &args).await,
        Command::Relays(args) => relays::handle(ctx, &args).await,
        Command::Settings => settings::show(ctx).await,
        Command::AllowLan { state } => settings::allow_lan(ctx, state).await,
        Command::Bridge { state } => settings::bridge(ctx, state).await,
        Command::Events => events::handle(ctx).await,
        Command::Version => version::handle(ctx).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled without a daemon connection".into(),
        }),
    }
}
