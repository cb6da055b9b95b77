//! Command-line arguments shared by every binary in the workspace
//!
//! Services flatten [`ServiceArgs`] into their own clap parser.

use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::Args;

/// Common service startup arguments
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(Args))]
pub struct ServiceArgs {
    /// Configuration file (YAML, TOML or JSON)
    #[cfg_attr(feature = "cli", arg(short = 'c', long, global = true, env = "STOVESRV_CONFIG"))]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[cfg_attr(
        feature = "cli",
        arg(short = 'l', long, global = true, default_value = "info")
    )]
    pub log_level: String,

    /// Disable colored output (useful for log files)
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub no_color: bool,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            config: None,
            log_level: "info".to_string(),
            no_color: false,
        }
    }
}

impl ServiceArgs {
    /// Parse log level string to tracing::Level
    pub fn parse_log_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    /// Canonical lowercase filter for the parsed level
    pub fn log_filter(&self) -> String {
        self.parse_log_level().to_string().to_lowercase()
    }
}
