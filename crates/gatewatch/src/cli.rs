//! Clap derive structures for the `gatewatch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gatewatch -- link statistics and action decoding for wireless gateways
#[derive(Debug, Parser)]
#[command(
    name = "gatewatch",
    version,
    about = "Replay wireless gateway telemetry through the link-statistics core",
    long_about = "Feeds captured Zigbee and BLE gateway frames to per-device stats,\n\
        action and scanner entities, then prints what they publish.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "GATEWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GATEWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a newline-delimited frame capture
    #[command(alias = "r")]
    Replay(ReplayArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Capture file, one `{"key": ..., "frame": {...}}` object per line
    /// ("-" or omitted reads stdin)
    pub input: Option<PathBuf>,

    /// Print every snapshot and event as it is published
    #[arg(long, short = 'f')]
    pub follow: bool,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Attach Zigbee link statistics for a device id (repeatable)
    #[arg(long, value_name = "DID")]
    pub zigbee: Vec<String>,

    /// Attach BLE advertisement statistics for a MAC address (repeatable)
    #[arg(long, value_name = "MAC")]
    pub ble: Vec<String>,

    /// Attach an action entity for a device key (repeatable)
    #[arg(long, value_name = "KEY")]
    pub action: Vec<String>,

    /// Attach gateway availability stats for a gateway id (repeatable)
    #[arg(long, value_name = "DID")]
    pub gateway: Vec<String>,

    /// Attach an attribute sensor, e.g. lumi.158d0001=temperature (repeatable)
    #[arg(long, value_name = "KEY=ATTR", value_parser = parse_sensor)]
    pub sensor: Vec<(String, String)>,

    /// Attach the BLE inventory scanner
    #[arg(long)]
    pub scanner: bool,

    /// Override how long action labels stay published
    #[arg(long, value_name = "MS")]
    pub pulse_delay_ms: Option<u64>,

    /// Report the gateway as unreachable
    #[arg(long)]
    pub gateway_offline: bool,
}

fn parse_sensor(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, attr)) if !key.is_empty() && !attr.is_empty() => {
            Ok((key.to_owned(), attr.to_owned()))
        }
        _ => Err(format!("expected KEY=ATTR, got '{raw}'")),
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
