//! HTTP API
//!
//! Read access to the latest poll state and entity views, stove commands,
//! and runtime log-level control.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use duepi_evo::StoveSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::SERVICE_NAME;
use crate::entities::EntityViews;
use crate::error::{Result, StoveSrvError};
use crate::poller::{PollPhase, StoveCoordinator};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<StoveCoordinator>,
    pub device_code: Arc<str>,
}

impl AppState {
    pub fn new(coordinator: Arc<StoveCoordinator>, device_code: &str) -> Self {
        Self {
            coordinator,
            device_code: Arc::from(device_code),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/stove/status", get(get_status))
        .route("/api/stove/command", post(send_command))
        .route("/api/stove/refresh", post(request_refresh))
        .route(
            "/api/admin/log-level",
            get(get_log_level).put(set_log_level),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub phase: PollPhase,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub polls: u64,
    pub snapshot: StoveSnapshot,
    pub entities: EntityViews,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct LogLevelResponse {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct SetLogLevelRequest {
    pub level: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Latest poll state; 503 until the first successful poll
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>> {
    let poll = state.coordinator.state();
    let Some(snapshot) = poll.snapshot.as_deref() else {
        let detail = poll
            .last_error
            .unwrap_or_else(|| "No data received from the stove yet".to_string());
        return Err(StoveSrvError::update_failed(detail));
    };

    Ok(Json(StatusResponse {
        phase: poll.phase,
        last_update_success: poll.last_update_success,
        last_error: poll.last_error.clone(),
        last_attempt: poll.last_attempt,
        last_success: poll.last_success,
        consecutive_failures: poll.consecutive_failures,
        polls: poll.polls,
        snapshot: snapshot.clone(),
        entities: EntityViews::new(&state.device_code, Some(snapshot)),
    }))
}

fn required_value(request: &CommandRequest) -> Result<f64> {
    match request.value {
        Some(value) if value.is_finite() => Ok(value),
        Some(value) => Err(StoveSrvError::validation(format!(
            "Command '{}' needs a finite value, got {}",
            request.command, value
        ))),
        None => Err(StoveSrvError::validation(format!(
            "Command '{}' requires a value",
            request.command
        ))),
    }
}

pub async fn send_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<serde_json::Value>> {
    let coordinator = &state.coordinator;

    let result = match request.command.as_str() {
        "power_on" => coordinator.power_on().await,
        "power_off" => coordinator.power_off().await,
        "set_temp" => {
            let temp = required_value(&request)?;
            coordinator.set_target_temperature(temp).await
        },
        "set_power" => {
            let level = required_value(&request)?;
            coordinator.set_power_level(level.trunc() as i32).await
        },
        "reset_error" => coordinator.reset_error().await,
        other => {
            return Err(StoveSrvError::validation(format!(
                "Unknown command '{}'",
                other
            )))
        },
    };

    if let Err(e) = result {
        warn!("Command {} failed: {}", request.command, e);
        return Err(e);
    }

    info!("Command {} accepted", request.command);
    Ok(Json(json!({ "success": true })))
}

pub async fn request_refresh(State(state): State<AppState>) -> impl IntoResponse {
    state.coordinator.request_refresh();
    (StatusCode::ACCEPTED, Json(json!({ "success": true })))
}

pub async fn get_log_level() -> Json<LogLevelResponse> {
    Json(LogLevelResponse {
        level: common::logging::get_log_level(),
    })
}

pub async fn set_log_level(
    Json(request): Json<SetLogLevelRequest>,
) -> Result<Json<LogLevelResponse>> {
    common::logging::set_log_level(&request.level).map_err(StoveSrvError::validation)?;
    Ok(Json(LogLevelResponse {
        level: request.level,
    }))
}
