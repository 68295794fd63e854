use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use kairos_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    AuthorizationError(String),
    ConflictError(String),
    GoneError(String),
    StoreUnavailable(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Hold store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service temporarily unavailable".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let msg = err.to_string();
        match err {
            CoreError::HoldConflict => Self::ConflictError(msg),
            CoreError::HoldNotFound | CoreError::HoldExpired => Self::GoneError(msg),
            CoreError::Unauthorized => Self::AuthorizationError(msg),
            CoreError::Validation(_) => Self::ValidationError(msg),
            CoreError::Store(_) => Self::StoreUnavailable(msg),
        }
    }
}
