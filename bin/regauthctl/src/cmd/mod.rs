//! Built-in `regauthctl` commands.
use clap::Parser;
use clap::Subcommand;

use crate::logging::LogLevel;

pub mod check;
pub mod lookup;

/// Check registry authentication configuration and look identities up.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the registry authentication configuration to use.
    #[arg(short = 'c', long = "config", default_value_t = String::from("config.yaml"), global = true)]
    pub config: String,

    /// Logging verbosity, overrides the configured level.
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Select the regauthctl command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Select the regauthctl command to run.
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Validate the configuration of the selected identity backend.
    #[command(alias = "validate")]
    Check,

    /// Look a user up from the configured identity backend.
    Lookup(lookup::LookupArgs),
}
