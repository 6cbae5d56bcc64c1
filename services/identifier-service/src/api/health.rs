//! Health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "lotline";

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Current timestamp (ISO 8601).
    pub timestamp: String,

    /// Grammar used for new LOTs, e.g. "V2".
    pub active_format: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentHealth>,
}

/// Component health details.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentHealth {
    /// Counter and identifier store.
    pub store: ComponentStatus,
}

/// Individual component status.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentStatus {
    /// Status: "ok" or "unavailable".
    pub status: String,

    /// "postgres" or "memory".
    pub backend: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

fn response(state: &AppState, ok: bool, components: Option<ComponentHealth>) -> HealthResponse {
    HealthResponse {
        status: if ok { "ok" } else { "degraded" }.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        active_format: state.service().active_format().to_string(),
        components,
    }
}

/// Liveness with service metadata. Does not check dependencies.
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(response(&state, true, None))
}

/// Readiness: 503 until the store answers.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.check_store().await;
    let ok = result.is_ok();

    let components = ComponentHealth {
        store: ComponentStatus {
            status: if ok { "ok" } else { "unavailable" }.to_string(),
            backend: if state.db().is_some() { "postgres" } else { "memory" }.to_string(),
            message: result.err().map(|e| e.to_string()),
        },
    };

    let body = Json(response(&state, ok, Some(components)));
    if ok {
        (StatusCode::OK, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body)
    }
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
