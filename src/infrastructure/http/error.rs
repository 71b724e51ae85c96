//! HTTP Error Handling
//!
//! 业务错误统一以 HTTP 200 + `{errno, error, data}` 返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn errno(&self) -> i32 {
        match self {
            ApiError::NotFound(_) => errno::NOT_FOUND,
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
            ApiError::ServiceUnavailable(_) => errno::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.errno();
        let msg = match self {
            ApiError::NotFound(msg) => {
                tracing::warn!(errno = code, error = %msg, "Resource not found");
                msg
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(errno = code, error = %msg, "Bad request");
                msg
            }
            ApiError::Internal(msg) => {
                tracing::error!(errno = code, error = %msg, "Internal server error");
                msg
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(errno = code, error = %msg, "Service unavailable");
                msg
            }
        };

        (StatusCode::OK, Json(ErrorResponse::new(code, msg))).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            ApplicationError::UnknownVoice(_) => ApiError::BadRequest(e.to_string()),
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::Download(_) => ApiError::ServiceUnavailable(e.to_string()),
            ApplicationError::Load(_) | ApplicationError::Synthesis(_) => {
                ApiError::Internal(format!("Conversion failed: {}", e))
            }
            ApplicationError::RepositoryError(msg)
            | ApplicationError::StorageError(msg)
            | ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_error_mapping() {
        let err: ApiError = ApplicationError::UnknownVoice("xx".to_string()).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Unknown voice: xx"));

        let err: ApiError = ApplicationError::not_found("Conversion", "abc").into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = ApplicationError::Download("HTTP 404".to_string()).into();
        assert_eq!(err.errno(), errno::SERVICE_UNAVAILABLE);

        let err: ApiError = ApplicationError::Synthesis("exit 1".to_string()).into();
        assert!(matches!(err, ApiError::Internal(ref m) if m.starts_with("Conversion failed")));
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::BadRequest("No text found in markdown".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errno"], 400);
        assert_eq!(json["error"], "No text found in markdown");
        assert!(json["data"].is_null());
    }
}
