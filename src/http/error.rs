//! Maps `OrchError`'s category (§7) onto an HTTP status code and a
//! machine-readable JSON body every handler returns on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use orch_core::{ErrorCategory, OrchError};
use serde::Serialize;

pub struct ApiError(pub OrchError);

impl From<OrchError> for ApiError {
    fn from(e: OrchError) -> Self {
        ApiError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    category: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::Validation | ErrorCategory::InvalidTransition => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCategory::External => StatusCode::BAD_GATEWAY,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if matches!(self.0.category(), ErrorCategory::Internal) {
            log::error!("internal error: {}", self.0);
        }
        let body = ErrorBody { category: self.0.category().as_str(), message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
