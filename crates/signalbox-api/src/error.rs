//! Signalbox — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use signalbox_core::error::DeliveryError;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection, migration, or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Database(error.into())
    }
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DeliveryError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DeliveryError);

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DeliveryError::MessageNotFound(_) => (StatusCode::NOT_FOUND, "message_not_found"),
            DeliveryError::InvalidState { .. } => (StatusCode::CONFLICT, "invalid_state"),
            DeliveryError::Publish(_) | DeliveryError::PublishTimeout(_) => {
                (StatusCode::BAD_GATEWAY, "publish_error")
            }
            DeliveryError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            DeliveryError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn status_of(err: DeliveryError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_message_not_found_maps_to_404() {
        assert_eq!(
            status_of(DeliveryError::MessageNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_invalid_state_maps_to_409() {
        assert_eq!(
            status_of(DeliveryError::InvalidState {
                id: Uuid::new_v4(),
                status: "processed".into(),
                operation: "manual retry",
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_publish_failure_maps_to_502() {
        assert_eq!(
            status_of(DeliveryError::Publish("broker down".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_store_failure_maps_to_500() {
        assert_eq!(
            status_of(DeliveryError::Store("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
