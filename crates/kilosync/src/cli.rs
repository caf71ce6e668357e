//! Clap derive structures for the `kilosync` CLI.
//!
//! Defines the command tree, global flags, and the value enums that map
//! onto core types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use kilosync_core::{DeviceModel, StartStopAction, StreamId, VideoInterface};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kilosync -- monitor and drive Kiloview encoders
#[derive(Debug, Parser)]
#[command(
    name = "kilosync",
    version,
    about = "Monitor and control Kiloview video encoders",
    long_about = "Polls a Kiloview encoder (E1/E2 legacy API or E3 token API), \
        reports recording and streaming-service state, and starts or stops \
        recordings and services.",
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
    /// Device profile to use
    #[arg(long, short = 'p', env = "KILOSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device address (overrides profile)
    #[arg(long, short = 'a', env = "KILOSYNC_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Device API generation
    #[arg(long, short = 'm', env = "KILOSYNC_MODEL", global = true)]
    pub model: Option<ModelArg>,

    /// Username for device authentication
    #[arg(long, short = 'u', env = "KILOSYNC_USER", global = true)]
    pub user: Option<String>,

    /// Password for device authentication
    #[arg(long, env = "KILOSYNC_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Log in before polling (token devices)
    #[arg(long, global = true)]
    pub use_auth: bool,

    /// Video interface (token devices)
    #[arg(long, short = 'i', global = true)]
    pub interface: Option<InterfaceArg>,

    /// Poll interval in milliseconds (minimum 1000)
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, env = "KILOSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// How long to wait for the device to come up, in seconds
    #[arg(long, default_value = "15", global = true)]
    pub wait: u64,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "KILOSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModelArg {
    /// E1/E2 devices (`/api/V1/*.lua`)
    #[value(alias = "e1e2")]
    Legacy,
    /// E3 devices (token API)
    #[value(alias = "e3")]
    Token,
}

impl From<ModelArg> for DeviceModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Legacy => Self::Legacy,
            ModelArg::Token => Self::Token,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InterfaceArg {
    Hdmi,
    Sdi,
    #[value(alias = "mix")]
    Pip,
    #[value(alias = "usb")]
    Uvc,
}

impl From<InterfaceArg> for VideoInterface {
    fn from(arg: InterfaceArg) -> Self {
        match arg {
            InterfaceArg::Hdmi => Self::Hdmi,
            InterfaceArg::Sdi => Self::Sdi,
            InterfaceArg::Pip => Self::Pip,
            InterfaceArg::Uvc => Self::Uvc,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StreamArg {
    Main,
    Sub,
    #[value(name = "main+sub", alias = "combined")]
    MainSub,
}

impl From<StreamArg> for StreamId {
    fn from(arg: StreamArg) -> Self {
        match arg {
            StreamArg::Main => Self::Main,
            StreamArg::Sub => Self::Sub,
            StreamArg::MainSub => Self::MainSub,
        }
    }
}

/// Streams that carry services.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ServiceStreamArg {
    Main,
    Sub,
}

impl From<ServiceStreamArg> for StreamId {
    fn from(arg: ServiceStreamArg) -> Self {
        match arg {
            ServiceStreamArg::Main => Self::Main,
            ServiceStreamArg::Sub => Self::Sub,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Start,
    Stop,
    Toggle,
}

impl From<ActionArg> for StartStopAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Start => Self::Start,
            ActionArg::Stop => Self::Stop,
            ActionArg::Toggle => Self::Toggle,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect once and report device state
    #[command(alias = "st")]
    Status,

    /// Poll continuously and print state changes
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List streaming services (RTSP excluded)
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// Start, stop, or toggle recording
    #[command(alias = "rec")]
    Record(RecordArgs),

    /// Start, stop, or toggle a streaming service
    Service(ServiceArgs),

    /// Video encoder control (token devices)
    Encoder(EncoderArgs),

    /// Show the console surface: actions, feedbacks, variables, presets
    Describe(DescribeArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ServicesArgs {
    /// Only this stream
    #[arg(long, short = 's')]
    pub stream: Option<ServiceStreamArg>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    pub action: ActionArg,

    /// Stream to record
    #[arg(long, short = 's', default_value = "main")]
    pub stream: StreamArg,
}

#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// Stream the service belongs to
    pub stream: ServiceStreamArg,

    /// Service ID (see `kilosync services`)
    pub id: String,

    pub action: ActionArg,
}

#[derive(Debug, Args)]
pub struct EncoderArgs {
    #[command(subcommand)]
    pub command: EncoderCommand,
}

#[derive(Debug, Subcommand)]
pub enum EncoderCommand {
    /// Enable the video encoder on the configured interface
    Enable,

    /// Show whether the configured interface has an active encoder input
    Status,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    #[command(subcommand)]
    pub target: DescribeTarget,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum DescribeTarget {
    /// Action definitions for the connected device
    Actions,
    /// Feedback definitions for the connected device
    Feedbacks,
    /// Display variables (current values when connected)
    Variables {
        /// Connect and fill in current values
        #[arg(long)]
        live: bool,
    },
    /// Static button presets
    Presets,
}

impl DescribeTarget {
    /// Whether answering requires a device connection.
    pub fn needs_device(self) -> bool {
        match self {
            Self::Actions | Self::Feedbacks => true,
            Self::Variables { live } => live,
            Self::Presets => false,
        }
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
    /// Create or replace a profile from the global flags
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a single profile key
    Set { key: String, value: String },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use { name: String },

    /// Store a profile password in the system keyring (read from stdin)
    SetPassword {
        #[arg(long)]
        profile: Option<String>,
    },
}
