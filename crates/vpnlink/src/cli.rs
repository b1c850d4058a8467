//! Clap derive structures for the `vpnlink` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Also
//! compiled by `build.rs` for man page generation, so it may only use clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vpnlink -- control a locally running VPN daemon
#[derive(Debug, Parser)]
#[command(
    name = "vpnlink",
    version,
    about = "Control a local VPN daemon from the command line",
    long_about = "Talks JSON-RPC to the VPN daemon over its local socket.\n\n\
        Connect and disconnect the tunnel, inspect account and relay data,\n\
        change settings, and stream daemon events.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Daemon socket path or tcp://host:port (overrides config)
    #[arg(long, short = 'e', env = "VPNLINK_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Output format [default: from config, else plain]
    #[arg(long, short = 'o', env = "VPNLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// RPC timeout in seconds (overrides config)
    #[arg(long, env = "VPNLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables
    Plain,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Self::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BridgeArg {
    /// Always connect through a bridge
    On,
    /// Use a bridge when direct connections fail
    Auto,
    /// Never use a bridge
    Off,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the tunnel state
    #[command(alias = "st")]
    Status,

    /// Connect the tunnel
    Connect(ConnectArgs),

    /// Disconnect the tunnel
    Disconnect,

    /// Show account expiry, or log in with a new account token
    Account(AccountArgs),

    /// Show the current exit location
    #[command(alias = "loc")]
    Location(LocationArgs),

    /// List relays known to the daemon
    Relays(RelaysArgs),

    /// Show daemon settings
    Settings,

    /// Allow or block local network access while connected
    AllowLan {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Set the bridge mode
    Bridge {
        #[arg(value_enum)]
        state: BridgeArg,
    },

    /// Stream daemon events until interrupted
    Events,

    /// Show CLI and daemon versions
    Version,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// Wait until the tunnel is connected or blocked
    #[arg(long, short = 'w')]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    /// Account token to log in with
    pub token: Option<String>,

    /// Log out of the current account
    #[arg(long, conflicts_with = "token")]
    pub logout: bool,
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Keep retrying until the daemon knows the location
    #[arg(long, short = 'w')]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct RelaysArgs {
    /// Only show relays in this country (name or code)
    #[arg(long, short = 'c')]
    pub country: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Store the account token in the system keyring
    SetToken {
        /// Account token
        token: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
