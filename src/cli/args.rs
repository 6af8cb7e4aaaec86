//! CLI argument definitions using clap derive

use crate::record::MapKind;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// nss-updatedb - build nss_db style passwd and group caches
///
/// Enumerates a name service and atomically publishes a lookup cache
/// keyed by name, id and enumeration order.
#[derive(Parser, Debug)]
#[command(name = "nss-updatedb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "NSS_UPDATEDB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format (overrides general.log_format)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild caches from a name service
    Update(UpdateArgs),

    /// Look up a key in a published cache
    Lookup(LookupArgs),

    /// Show the state of the published caches
    Status(StatusArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the update command
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// Name service to enumerate (e.g. ldap, files)
    pub service: String,

    /// Only rebuild this map (default: passwd then group)
    #[arg(value_enum)]
    pub map: Option<MapKind>,

    /// Build in memory and publish nothing
    #[arg(long)]
    pub dry_run: bool,

    /// passwd cache path (overrides maps.passwd)
    #[arg(long)]
    pub passwd_db: Option<PathBuf>,

    /// group cache path (overrides maps.group)
    #[arg(long)]
    pub group_db: Option<PathBuf>,
}

impl UpdateArgs {
    /// Maps selected for this run, in update order
    pub fn maps(&self) -> Vec<MapKind> {
        match self.map {
            Some(map) => vec![map],
            None => MapKind::ALL.to_vec(),
        }
    }

    /// Path override given on the command line for `map`
    pub fn path_override(&self, map: MapKind) -> Option<&PathBuf> {
        match map {
            MapKind::Passwd => self.passwd_db.as_ref(),
            MapKind::Group => self.group_db.as_ref(),
        }
    }
}

/// Arguments for the lookup command
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Map to query
    #[arg(value_enum)]
    pub map: MapKind,

    #[command(flatten)]
    pub key: LookupKey,

    /// Cache file to read (overrides the configured path)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Exactly one way of addressing a record
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct LookupKey {
    /// Look up by user or group name
    #[arg(long)]
    pub name: Option<String>,

    /// Look up by uid or gid
    #[arg(long, allow_negative_numbers = true)]
    pub id: Option<i64>,

    /// Look up by enumeration position
    #[arg(long)]
    pub index: Option<u64>,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for status command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one map per line)
    Plain,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `general.log_format` config value, defaulting to text
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}
