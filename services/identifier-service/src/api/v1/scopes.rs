//! Sequence counter inspection.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use serde::Serialize;

use crate::allocator::AllocationScope;
use crate::api::error::ApiError;
use crate::db::ScopeCounter;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{scope_key}", get(get_scope))
}

#[derive(Debug, Serialize)]
struct ScopeResponse {
    #[serde(flatten)]
    counter: ScopeCounter,
    capacity: u16,
}

/// GET /v1/scopes/{scope_key}
async fn get_scope(
    State(state): State<AppState>,
    Path(scope_key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.service().scope_counter(&scope_key).await? {
        Some(counter) => Ok(Json(ScopeResponse {
            capacity: AllocationScope::capacity_of_key(&counter.scope_key),
            counter,
        })),
        None => Err(ApiError::not_found(
            "scope_not_found",
            format!("no sequence has been issued in scope '{scope_key}'"),
        )),
    }
}
