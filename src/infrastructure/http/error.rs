//! HTTP Error Handling
//!
//! 业务错误统一以 HTTP 200 + errno 返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;
use crate::domain::ReadingError;

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
    pub const INTERNAL_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let response = match &self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(errno = errno::BAD_REQUEST, error = %msg, "Bad request");
                ErrorResponse::new(errno::BAD_REQUEST, msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!(errno = errno::INTERNAL_ERROR, error = %msg, "Internal server error");
                ErrorResponse::new(errno::INTERNAL_ERROR, msg.clone())
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(errno = errno::SERVICE_UNAVAILABLE, error = %msg, "Service unavailable");
                ErrorResponse::new(errno::SERVICE_UNAVAILABLE, msg.clone())
            }
        };

        (StatusCode::OK, Json(response)).into_response()
    }
}

impl From<ReadingError> for ApiError {
    fn from(e: ReadingError) -> Self {
        match e {
            ReadingError::SegmentationEmpty
            | ReadingError::IndexOutOfRange { .. }
            | ReadingError::NoSession
            | ReadingError::InvalidArgument(_) => ApiError::BadRequest(e.to_string()),
            ReadingError::TransportUnreachable(_) | ReadingError::DeviceUnavailable(_) => {
                ApiError::ServiceUnavailable(e.to_string())
            }
            ReadingError::SynthesisFailed(_) | ReadingError::DecodeFailed(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::Reading(err) => err.into(),
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::SettingsError(msg) => ApiError::Internal(msg),
            ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_error_mapping() {
        assert!(matches!(
            ApiError::from(ReadingError::IndexOutOfRange { index: 5, total: 3 }),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ReadingError::TransportUnreachable("gone".to_string())),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(ApplicationError::validation("bad")),
            ApiError::BadRequest(_)
        ));
    }
}
