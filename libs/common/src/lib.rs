//! Shared service plumbing for the stove workspace
//!
//! Logging bootstrap, layered configuration loading, shutdown signal handling
//! and the command-line arguments every binary accepts.

pub mod bootstrap_args;
pub mod config_loader;
pub mod logging;
pub mod shutdown;

pub use config_loader::{load_config, ConfigLoadError};
pub use logging::LogConfig;
pub use shutdown::wait_for_shutdown;
