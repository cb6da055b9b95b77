//! Error handling for the stove service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use duepi_evo::DuepiError;
use serde_json::json;
use thiserror::Error;

/// Stove service error type
#[derive(Error, Debug, Clone)]
pub enum StoveSrvError {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Errors reported by the stove protocol client
    #[error("Protocol error: {0}")]
    ProtocolError(#[from] DuepiError),

    /// No snapshot could be obtained from the stove
    #[error("Update failed: {0}")]
    UpdateFailed(String),

    /// Invalid request parameters
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Input/Output operation errors
    #[error("IO error: {0}")]
    IoError(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias for the stove service
pub type Result<T> = std::result::Result<T, StoveSrvError>;

impl StoveSrvError {
    pub fn config(msg: impl Into<String>) -> Self {
        StoveSrvError::ConfigError(msg.into())
    }

    pub fn update_failed(msg: impl Into<String>) -> Self {
        StoveSrvError::UpdateFailed(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        StoveSrvError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        StoveSrvError::InternalError(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StoveSrvError::ValidationError(_) => StatusCode::BAD_REQUEST,
            StoveSrvError::ProtocolError(_) => StatusCode::BAD_GATEWAY,
            StoveSrvError::UpdateFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoveSrvError::ConfigError(_)
            | StoveSrvError::IoError(_)
            | StoveSrvError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used as the `error` field of API responses
    fn label(&self) -> &'static str {
        match self {
            StoveSrvError::ConfigError(_) => "Configuration error",
            StoveSrvError::ProtocolError(DuepiError::Connection { .. }) => "Stove unreachable",
            StoveSrvError::ProtocolError(_) => "Command failed",
            StoveSrvError::UpdateFailed(_) => "No stove data",
            StoveSrvError::ValidationError(_) => "Invalid request",
            StoveSrvError::IoError(_) | StoveSrvError::InternalError(_) => "Internal error",
        }
    }
}

// ============================================================================
// From implementations for external error types
// ============================================================================

impl From<std::io::Error> for StoveSrvError {
    fn from(err: std::io::Error) -> Self {
        StoveSrvError::IoError(err.to_string())
    }
}

impl From<common::ConfigLoadError> for StoveSrvError {
    fn from(err: common::ConfigLoadError) -> Self {
        StoveSrvError::ConfigError(err.to_string())
    }
}

// ============================================================================
// Extension trait for adding context to errors
// ============================================================================

/// Extension trait for adding context to errors
pub trait ErrorExt<T> {
    fn config_error(self, msg: &str) -> Result<T>;
    fn io_error(self, msg: &str) -> Result<T>;
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn config_error(self, msg: &str) -> Result<T> {
        self.map_err(|e| StoveSrvError::ConfigError(format!("{msg}: {e}")))
    }

    fn io_error(self, msg: &str) -> Result<T> {
        self.map_err(|e| StoveSrvError::IoError(format!("{msg}: {e}")))
    }

    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| StoveSrvError::InternalError(format!("{msg}: {e}")))
    }
}

impl IntoResponse for StoveSrvError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.label(),
            "detail": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
