//! LOT and Serial minting endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::NaiveDate;
use lotline_codec::{FormatVersion, LotIdentifier, SerialIdentifier};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(mint_lot))
        .route("/{code}/serials", post(mint_serial))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to mint a LOT.
#[derive(Debug, Deserialize)]
pub struct MintLotRequest {
    /// Production line, e.g. `KR001`.
    pub line: String,

    /// Full model name, looked up in the model table.
    pub model: String,

    /// Any day in the production month.
    pub target_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct LotResponse {
    pub code: String,
    pub formatted: String,
    pub version: FormatVersion,
    pub sequence: u16,
}

impl From<&LotIdentifier> for LotResponse {
    fn from(lot: &LotIdentifier) -> Self {
        Self {
            code: lot.code().to_string(),
            formatted: lot
                .version()
                .display(lot.code())
                .unwrap_or_else(|_| lot.code().to_string()),
            version: lot.version(),
            sequence: lot.sequence(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SerialResponse {
    pub code: String,
    pub formatted: String,
    pub version: FormatVersion,
    pub lot_code: String,
    pub unit_sequence: u16,
}

impl From<&SerialIdentifier> for SerialResponse {
    fn from(serial: &SerialIdentifier) -> Self {
        Self {
            code: serial.code().to_string(),
            formatted: serial
                .version()
                .display(serial.code())
                .unwrap_or_else(|_| serial.code().to_string()),
            version: serial.version(),
            lot_code: serial.lot_code().to_string(),
            unit_sequence: serial.unit(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Mint the next LOT for a line, model, and month.
///
/// POST /v1/lots
async fn mint_lot(
    State(state): State<AppState>,
    Json(req): Json<MintLotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lot = state
        .service()
        .mint_lot(&req.line, &req.model, req.target_date)
        .await?;
    Ok((StatusCode::CREATED, Json(LotResponse::from(&lot))))
}

/// Mint the next Serial of a stored LOT.
///
/// POST /v1/lots/{code}/serials
async fn mint_serial(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state.service();
    let lot = service
        .lot_by_code(&code)
        .await
        .map_err(|e| ApiError::from(e).with_instance(format!("/v1/lots/{code}")))?;
    let serial = service.mint_serial(&lot).await?;
    Ok((StatusCode::CREATED, Json(SerialResponse::from(&serial))))
}
