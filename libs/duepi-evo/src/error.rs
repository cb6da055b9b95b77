//! Protocol client error types

use thiserror::Error;

/// Result type for duepi-evo operations
pub type Result<T> = std::result::Result<T, DuepiError>;

/// Duepi EVO protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DuepiError {
    /// TCP connect, handshake write or timeout while connecting
    #[error("Connection to {host}:{port} failed: {cause}")]
    Connection {
        host: String,
        port: u16,
        cause: String,
    },

    /// Command exchange failed, including its reconnect retry
    #[error("Command {code} failed: {cause}")]
    Command { code: String, cause: String },

    /// Command code text that cannot be framed
    #[error("Invalid command code: {0}")]
    InvalidCommand(String),
}

impl DuepiError {
    pub fn connection(host: impl Into<String>, port: u16, cause: impl ToString) -> Self {
        DuepiError::Connection {
            host: host.into(),
            port,
            cause: cause.to_string(),
        }
    }

    pub fn command(code: impl Into<String>, cause: impl ToString) -> Self {
        DuepiError::Command {
            code: code.into(),
            cause: cause.to_string(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, DuepiError::Connection { .. })
    }

    pub fn is_command(&self) -> bool {
        matches!(self, DuepiError::Command { .. })
    }
}
