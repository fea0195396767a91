//! Webhook HTTP entry points (axum).
//!
//! - `POST <route>/`         update delivery; always 200 once authorized
//! - `POST <route>/HookUp`   start the refresh loop
//! - `POST <route>/HookDown` stop the refresh loop and deregister
//! - `GET  /health`          health probe

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use dbot_core::{BotApi, DbotError, Result, Update};
use tracing::{debug, warn};

use crate::health::{probe, HealthReport, HealthStatus};
use crate::webhook::WebhookCoordinator;

/// Header in which the bot API echoes the configured secret.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    pub coordinator: Arc<WebhookCoordinator>,
    pub api: Arc<dyn BotApi>,
}

/// Builds the router; paths are rooted at the configured route.
pub fn build_router(state: WebhookState) -> Router {
    let base = state.coordinator.settings().route_path();
    Router::new()
        .route(&format!("{}/", base), post(receive_update))
        .route(&format!("{}/HookUp", base), post(hook_up))
        .route(&format!("{}/HookDown", base), post(hook_down))
        .route("/health", get(health))
        .with_state(state)
}

fn authorized(state: &WebhookState, headers: &HeaderMap) -> bool {
    let header = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    state.coordinator.settings().authorize(header)
}

/// POST <route>/: one update. Dispatch failures are swallowed so the bot API does not redeliver.
async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !authorized(&state, &headers) {
        warn!("Rejected webhook delivery with missing or wrong secret token");
        return StatusCode::UNAUTHORIZED;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, body_len = body.len(), "Malformed update payload, dropped");
            return StatusCode::OK;
        }
    };

    let outcome = state.coordinator.handle_inbound_update(update).await;
    debug!(outcome = ?outcome, "step: webhook delivery processed");
    StatusCode::OK
}

/// POST <route>/HookUp
async fn hook_up(State(state): State<WebhookState>, headers: HeaderMap) -> (StatusCode, String) {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
    }
    control_response(state.coordinator.start().await)
}

/// POST <route>/HookDown
async fn hook_down(State(state): State<WebhookState>, headers: HeaderMap) -> (StatusCode, String) {
    if !authorized(&state, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
    }
    control_response(state.coordinator.stop().await)
}

fn control_response(result: Result<()>) -> (StatusCode, String) {
    match result {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e @ DbotError::Lifecycle(_)) => (StatusCode::CONFLICT, e.to_string()),
        Err(e @ (DbotError::Api { .. } | DbotError::Transport(_))) => {
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /health: 200 for healthy or degraded, 503 for unhealthy.
async fn health(State(state): State<WebhookState>) -> (StatusCode, Json<HealthReport>) {
    let report = probe(state.api.as_ref(), Some(state.coordinator.settings().as_ref())).await;
    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (status, Json(report))
}
