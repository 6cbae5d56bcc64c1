//! RFC 7807 problem responses.

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::db::DbError;
use crate::service::MintError;

#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub code: String,
    pub retryable: bool,
    pub retry_after_seconds: u32,
}

impl ProblemDetails {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        let title = status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string();
        Self {
            r#type: format!("https://lotline.dev/problems/{code}"),
            title,
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            code,
            retryable: false,
            retry_after_seconds: 0,
        }
    }

    fn set_retry_after_seconds(&mut self, seconds: u32) {
        self.retry_after_seconds = seconds;
        if seconds > 0 {
            self.retryable = true;
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn with_status(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let problem = Box::new(ProblemDetails::new(status, code, message));
        Self { status, problem }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, code, message)
    }

    pub fn unprocessable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, code, message)
    }

    pub fn service_unavailable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.problem.instance = Some(instance.into());
        self
    }

    pub fn with_retry_after_seconds(mut self, seconds: u32) -> Self {
        self.problem.set_retry_after_seconds(seconds);
        self
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateCode(_) => ApiError::conflict("duplicate_code", err.to_string()),
            DbError::UnknownLot(_) => ApiError::not_found("lot_not_found", err.to_string()),
            DbError::Conflict { .. } => {
                ApiError::service_unavailable("store_conflict", err.to_string())
                    .with_retry_after_seconds(1)
            }
            other => {
                error!(error = %other, "Store failure");
                ApiError::internal("store_error", "identifier store is unavailable")
            }
        }
    }
}

impl From<MintError> for ApiError {
    fn from(err: MintError) -> Self {
        match err {
            MintError::UnknownModel(_) => ApiError::bad_request("unknown_model", err.to_string()),
            MintError::InvalidLine(_) => ApiError::bad_request("invalid_line", err.to_string()),
            MintError::UnknownLot(_) => ApiError::not_found("lot_not_found", err.to_string()),
            MintError::Exhausted { .. } => {
                ApiError::conflict("sequence_exhausted", err.to_string())
            }
            MintError::Contention { .. } => {
                ApiError::service_unavailable("sequence_contention", err.to_string())
                    .with_retry_after_seconds(1)
            }
            MintError::Codec(_) => ApiError::unprocessable("unencodable_fields", err.to_string()),
            MintError::RetiredFormat(_) => {
                error!(error = %err, "Service configured with a retired format");
                ApiError::internal("retired_format", err.to_string())
            }
            MintError::Store(db) => db.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.problem)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_errors_map_to_status() {
        let err: ApiError = MintError::UnknownModel("ZZZ99".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.problem.code, "unknown_model");

        let err: ApiError = MintError::Exhausted {
            scope_key: "lot:KR001:PSA:2025-11".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(!err.problem.retryable);

        let err: ApiError = MintError::Contention {
            scope_key: "lot:KR001:PSA:2025-11".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.problem.retryable);
        assert_eq!(err.problem.retry_after_seconds, 1);
    }

    #[test]
    fn test_problem_content_type() {
        let response = ApiError::not_found("lot_not_found", "missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }
}
