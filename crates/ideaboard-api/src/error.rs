//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"name": ..., "message": ...}`.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use ideaboard_core::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Error raised by a repository or the object store.
    #[error(transparent)]
    Core(#[from] Error),

    /// Request rejected at the transport boundary (body, path, query).
    #[error("{0}")]
    Validation(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub name: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Core(Error::NotFound(message.into()))
    }

    fn status_and_name(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) | ApiError::Core(Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "ValidationError")
            }
            ApiError::Core(Error::NotFound(_)) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Core(Error::ConstraintViolation(_)) => {
                (StatusCode::BAD_REQUEST, "ConstraintViolation")
            }
            ApiError::Core(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, name) = self.status_and_name();
        let message = match &self {
            ApiError::Core(Error::NotFound(msg))
            | ApiError::Core(Error::InvalidInput(msg))
            | ApiError::Core(Error::ConstraintViolation(msg))
            | ApiError::Validation(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(subsystem = "api", error = %self, "Request failed");
        } else {
            debug!(subsystem = "api", status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(ErrorBody { name, message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Validation(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::not_found("x"), StatusCode::NOT_FOUND, "NotFound"),
            (
                ApiError::Core(Error::InvalidInput("x".into())),
                StatusCode::BAD_REQUEST,
                "ValidationError",
            ),
            (
                ApiError::Validation("x".into()),
                StatusCode::BAD_REQUEST,
                "ValidationError",
            ),
            (
                ApiError::Core(Error::ConstraintViolation("x".into())),
                StatusCode::BAD_REQUEST,
                "ConstraintViolation",
            ),
            (
                ApiError::Core(Error::Storage("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
            ),
            (
                ApiError::Core(Error::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
            ),
        ];
        for (err, status, name) in cases {
            assert_eq!(err.status_and_name(), (status, name));
        }
    }

    #[tokio::test]
    async fn test_body_shape() {
        let response = ApiError::not_found("Idea 7 not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"name": "NotFound", "message": "Idea 7 not found"})
        );
    }
}
