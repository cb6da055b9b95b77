//! Service bootstrap
//!
//! Command-line parsing and logging setup. Shared flags come from
//! `common::bootstrap_args`.

use clap::{Parser, Subcommand};

use crate::config::{LoggingSection, SERVICE_NAME};
use crate::error::{ErrorExt, Result};

pub use common::bootstrap_args::ServiceArgs;

/// Command-line arguments for stovesrv
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stovesrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Duepi EVO pellet stove service",
    long_about = None
)]
pub struct Args {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Talk to an in-process stove simulator instead of the configured host
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Poll the stove and serve the HTTP API until stopped (default)
    Run,
    /// Poll once and print the snapshot as JSON
    Status,
    /// Connect, read the status word and disconnect
    TestConnection,
    /// Start the stove
    PowerOn,
    /// Stop the stove
    PowerOff,
    /// Set the power level (0-6, 6 = auto)
    SetPower {
        #[arg(allow_negative_numbers = true)]
        level: i32,
    },
    /// Set the target room temperature in °C
    SetTemp {
        #[arg(allow_negative_numbers = true)]
        temp: f64,
    },
    /// Clear the active alarm
    ResetError,
    /// Load and validate the configuration, then exit
    Validate,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

/// Initialize logging from command-line flags and the logging section
pub fn initialize_logging(args: &ServiceArgs, logging: &LoggingSection) -> Result<()> {
    let log_config = common::LogConfig {
        level: args.log_filter(),
        debug_targets: vec!["duepi_evo".to_string()],
        log_dir: logging.dir.clone(),
        enable_json: logging.json,
        ansi: !args.no_color,
        ..common::LogConfig::new(SERVICE_NAME)
    };

    common::logging::init_with_config(log_config).context("Failed to init logging")
}
