//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::appointments::ScheduleError;
use crate::auth::AuthError;
use crate::core_state::CoreError;
use crate::patients::PatientError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient privileges")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Insufficient privileges".to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(msg) => ApiError::BadRequest(msg),
            ScheduleError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ScheduleError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::Validation(msg) => ApiError::BadRequest(msg),
            PatientError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PatientError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Inactive => ApiError::Unauthorized,
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            AuthError::Hash => ApiError::Internal("password hashing failed".into()),
            AuthError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let response = ApiError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let err: ApiError = ScheduleError::Validation("bad status".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["message"], "bad status");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }
}
