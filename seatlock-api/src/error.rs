use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use seatlock_booking::FacadeError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    AuthorizationError(String),
    NotFoundError(String),
    ConflictError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
        };

        tracing::debug!("Request rejected with {}: {}", status, error_message);

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<FacadeError> for AppError {
    fn from(err: FacadeError) -> Self {
        match err {
            FacadeError::ValidationError(msg) => AppError::ValidationError(msg),
            FacadeError::NotFound(msg) => AppError::NotFoundError(msg),
            FacadeError::Conflict(msg) => AppError::ConflictError(msg),
            FacadeError::Forbidden(msg) => AppError::AuthorizationError(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
