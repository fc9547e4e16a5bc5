use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::recommendation::RecommendationMethod;
use crate::recommendation::RecommendError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Upstream returned an unusable response: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    /// A completed run with nothing worth recommending. Renders as 200 with
    /// `outcome = "no_suitable_locations"`, never as an error status.
    #[error("No suitable locations ({method}): {reason}")]
    NoSuitableLocations {
        method: RecommendationMethod,
        reason: String,
    },
}

impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::InvalidBounds(_) => AppError::UnprocessableEntity(err.to_string()),
            RecommendError::InvalidRequest(msg) => AppError::Validation(msg),
            RecommendError::NoSuitableLocations { method, reason } => {
                AppError::NoSuitableLocations { method, reason }
            }
            RecommendError::MalformedLlmResponse(_) => AppError::BadGateway(err.to_string()),
            RecommendError::MlServiceUnavailable(_)
            | RecommendError::LlmServiceUnavailable(_)
            | RecommendError::CombinedFailure { .. } => {
                AppError::ServiceUnavailable(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::BadGateway(msg) => {
                tracing::error!("Bad gateway: {msg}");
                (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.clone())
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::NoSuitableLocations { method, reason } => {
                let body = Json(json!({
                    "method": method,
                    "outcome": "no_suitable_locations",
                    "message": reason,
                    "recommendations": []
                }));
                return (StatusCode::OK, body).into_response();
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
