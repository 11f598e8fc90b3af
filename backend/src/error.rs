//! HTTP-facing error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::directory::DirectoryError;
use crate::trips::GenerateError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Could not parse upstream response: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_failure"),
            ApiError::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "parse_failure"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error_type, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => ApiError::NotFound(format!("user {}", id)),
            DirectoryError::Upstream(msg) => ApiError::Upstream(msg),
            DirectoryError::Database(msg) | DirectoryError::Io(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Upstream(msg) => ApiError::Upstream(msg),
            GenerateError::Parse(msg) => ApiError::Parse(msg),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound("x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized("x".into()).into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::RateLimited.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::Parse("x".into()).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Upstream("x".into()).into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_directory_not_found_maps_to_404() {
        let err: ApiError = DirectoryError::NotFound("acc-9".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("acc-9")));
    }

    #[test]
    fn test_generate_errors_keep_their_kind() {
        let parse: ApiError = GenerateError::Parse("bad json".to_string()).into();
        assert!(matches!(parse, ApiError::Parse(_)));
        let upstream: ApiError = GenerateError::Upstream("503".to_string()).into();
        assert!(matches!(upstream, ApiError::Upstream(_)));
    }
}
