//! Maps [`banner_core::ServiceError`] (and a handful of adapter-local error
//! cases — bad query strings, missing tokens) onto the HTTP status table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use banner_core::ServiceError;
use serde::Serialize;

/// The `{"error": "..."}` envelope every non-2xx response carries.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Wraps a [`ServiceError`] so it can be returned directly from an `axum` handler.
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ServiceError::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            ServiceError::ConflictExists => (StatusCode::CONFLICT, self.0.to_string()),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            ServiceError::Transient(_) => {
                tracing::error!(error = %self.0, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "some server error, try again later".to_string())
            }
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

/// Adapter-local failures that never reach [`banner_core`]: a malformed query
/// string, a missing/wrong-kind auth token.
pub enum AdapterError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdapterError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AdapterError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing token".to_string()),
            AdapterError::Forbidden => (StatusCode::FORBIDDEN, "token does not grant this permission".to_string()),
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}
