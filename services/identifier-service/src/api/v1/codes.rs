//! Code lookup endpoint.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use lotline_codec::FormatVersion;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{code}", get(lookup_code))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    /// Forces a grammar instead of the stored tag or detection.
    pub version: Option<String>,
}

/// Decode a LOT or Serial code.
///
/// GET /v1/codes/{code}
///
/// Always 200 for any code; `valid: false` carries the decode error.
async fn lookup_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = query
        .version
        .as_deref()
        .map(str::parse::<FormatVersion>)
        .transpose()
        .map_err(|e| ApiError::bad_request("invalid_version", e.to_string()))?;

    let report = state.service().lookup(&code, version).await?;
    Ok(Json(report))
}
