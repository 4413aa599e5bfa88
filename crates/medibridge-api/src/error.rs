//! API error handling
//!
//! Every failure renders as `{status, error, fields?}` where `status` mirrors
//! the HTTP status code. Successful responses use [`ApiResponse`].
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use medibridge_core::CoreError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Human-readable message
    pub error: String,
    /// Failing fields for validation errors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    pub fn with_status(
        status: StatusCode,
        message: impl Into<String>,
        data: Option<T>,
    ) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                status: status.as_u16(),
                message: message.into(),
                data,
            }),
        )
    }
}

impl ApiResponse<()> {
    /// Message-only response
    pub fn message(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, message, None)
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    BadRequest(String),

    #[error("validation failed")]
    ValidationFailed { fields: Vec<String> },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("operation timed out")]
    Timeout,

    #[error("database operation failed")]
    Database(String),

    #[error("internal server error")]
    Internal(String),
}

impl AppError {
    pub fn validation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::ValidationFailed {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Details of server-side failures stay in the logs
        match &self {
            AppError::Database(detail) | AppError::Internal(detail) => {
                error!(status = status.as_u16(), detail = %detail, "Request failed");
            }
            AppError::Timeout => error!(status = status.as_u16(), "Request timed out"),
            _ => {}
        }

        let fields = match &self {
            AppError::ValidationFailed { fields } => fields.clone(),
            _ => Vec::new(),
        };
        let body = ApiError {
            status: status.as_u16(),
            error: self.to_string(),
            fields,
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => AppError::NotFound(what),
            CoreError::Conflict(msg) => AppError::Conflict(msg),
            CoreError::ValidationFailed { fields, .. } => AppError::ValidationFailed { fields },
            CoreError::Timeout { .. } => AppError::Timeout,
            CoreError::DatabaseError(msg) => AppError::Database(msg),
            CoreError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            CoreError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        AppError::ValidationFailed { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mirrors_code() {
        let (status, body) = render(AppError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], 403);
        assert_eq!(body["error"], "insufficient permissions");
        assert!(body.get("fields").is_none());
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let (status, body) = render(AppError::validation(["age", "gender"])).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"], serde_json::json!(["age", "gender"]));
    }

    #[tokio::test]
    async fn test_database_detail_not_leaked() {
        let (status, body) = render(AppError::Database("password=hunter2".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "database operation failed");
    }

    #[test]
    fn test_core_error_mapping() {
        let timeout: AppError = CoreError::Timeout {
            operation: "session lookup".to_string(),
        }
        .into();
        assert_eq!(timeout.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let conflict: AppError = CoreError::Conflict("email taken".to_string()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let missing: AppError = CoreError::NotFound("patient".to_string()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }
}
