use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Uniform JSON error envelope (§7): `{error: string}` with a status code chosen by the handler —
/// never a generic 500 catch-all for expected domain failures.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Unknown-entity and bad-input failures raised via anyhow::bail! in the engine surface
        // as 400s here; §7 reserves 500 for catastrophic engine failure, which this crate's
        // dynamic operations never raise (they return typed `anyhow::Result` rejections instead).
        ApiError::bad_request(err.to_string())
    }
}

impl From<crate::ports::store::StoreError> for ApiError {
    fn from(err: crate::ports::store::StoreError) -> Self {
        ApiError::internal(err.to_string())
    }
}
