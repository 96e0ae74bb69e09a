//! HTTP mapping for core errors.
//!
//! Every failing handler returns the same envelope:
//! `{ "ok": false, "code": "...", "message": "...", "details": {...} }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use reelforge_core::CoreError;

/// A core error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    code: &'static str,
    message: String,
    details: Value,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::AuthFail(_) => StatusCode::UNAUTHORIZED,
        CoreError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::StateTransition { .. } => StatusCode::CONFLICT,
        CoreError::ThirdParty { .. } => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::IdempotencyConflict(_) => StatusCode::CONFLICT,
        CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = ErrorBody {
            ok: false,
            code: self.0.code(),
            message: self.0.to_string(),
            details: self.0.details(),
        };
        (status, Json(body)).into_response()
    }
}
