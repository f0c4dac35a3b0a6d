//! Clap derive structures for the `devtester` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// devtester -- manage test devices and probe their data feeds
#[derive(Debug, Parser)]
#[command(
    name = "devtester",
    version,
    about = "Manage test devices and inspect their data feeds",
    long_about = "Keeps an inventory of test devices (agent, address, port, credentials),\n\
        runs a simulated authentication step against them, and shows their\n\
        static description and live dynamic data.",
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
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "DEVTESTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "DEVTESTER_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

impl GlobalOpts {
    /// Fill unset format flags from configured defaults. Unparseable
    /// values leave the built-in default in place.
    pub fn apply_defaults(&mut self, output: &str, color: &str) {
        if self.output.is_none() {
            self.output = OutputFormat::from_str(output, true).ok();
        }
        if self.color.is_none() {
            self.color = ColorMode::from_str(color, true).ok();
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the device inventory
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Fetch static and live dynamic data for a device
    Data(DataArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices in inventory order (newest first)
    #[command(alias = "ls")]
    List,

    /// Show one device
    Get {
        /// Device ID
        device: String,
    },

    /// Add a new device
    Add(DeviceFields),

    /// Edit an existing device; omitted fields keep their values
    Update {
        /// Device ID
        device: String,

        #[command(flatten)]
        fields: DeviceFields,
    },

    /// Remove a device
    #[command(alias = "rm")]
    Remove {
        /// Device ID
        device: String,
    },

    /// Run the authentication check on one device, or on all of them
    #[command(alias = "auth")]
    Authenticate {
        /// Device ID
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        device: Option<String>,

        /// Reset and re-check every device
        #[arg(long)]
        all: bool,
    },

    /// List the ports offered for an agent
    Ports {
        /// Agent name (Redfish, EcoRT, SoftdPACManager)
        agent: String,
    },
}

/// Editable device fields shared by `add` and `update`.
#[derive(Debug, Default, Args)]
pub struct DeviceFields {
    /// Agent (Redfish, EcoRT, SoftdPACManager)
    #[arg(long)]
    pub agent: Option<String>,

    /// Device ID (GUID); generated when omitted on add
    #[arg(long)]
    pub device_id: Option<String>,

    /// Solution ID (GUID); generated when omitted on add
    #[arg(long)]
    pub solution_id: Option<String>,

    /// Display name; defaults to "Device <agent>"
    #[arg(long)]
    pub name: Option<String>,

    /// IPv4 or IPv6 address
    #[arg(long)]
    pub ip: Option<String>,

    /// Port number, or "Other"
    #[arg(long)]
    pub port: Option<String>,

    /// Login user
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Login password (prompted when omitted on add)
    #[arg(long, env = "DEVTESTER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use a secure connection
    #[arg(long, overrides_with = "insecure")]
    pub secure: bool,

    /// Use a plain connection
    #[arg(long, overrides_with = "secure")]
    pub insecure: bool,
}

impl DeviceFields {
    /// Explicit connection choice, if either flag was given.
    pub fn secure_connection(&self) -> Option<bool> {
        match (self.secure, self.insecure) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

// ── Data ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommand,
}

#[derive(Debug, Subcommand)]
pub enum DataCommand {
    /// Fetch and print a device's static data
    Static {
        /// Device ID
        device: String,
    },

    /// Fetch dynamic data, then follow live updates until Ctrl-C
    Watch {
        /// Device ID
        device: String,

        /// Stop after this many live updates
        #[arg(long, short = 'n')]
        count: Option<usize>,
    },

    /// Record static/dynamic resource descriptors for a device
    Resources {
        /// Device ID
        device: String,

        /// Static resource descriptor
        #[arg(long, default_value = "")]
        static_text: String,

        /// Dynamic resource descriptor
        #[arg(long, default_value = "")]
        dynamic_text: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
