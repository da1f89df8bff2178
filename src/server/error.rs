//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`clipforge_core::Error`] so route handlers
//! can return `Result<T, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: clipforge_core::Error,
}

impl From<clipforge_core::Error> for AppError {
    fn from(inner: clipforge_core::Error) -> Self {
        Self { inner }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self {
            inner: clipforge_core::Error::from(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            clipforge_core::Error::NotFound { .. } => "not_found",
            clipforge_core::Error::Validation(_) => "validation_error",
            clipforge_core::Error::Tool { .. } => "tool_error",
            clipforge_core::Error::Probe(_) => "probe_error",
            clipforge_core::Error::Io { .. } => "io_error",
            clipforge_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.inner.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::from(clipforge_core::Error::not_found("job", "abc"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_produces_400() {
        let err = AppError::from(clipforge_core::Error::Validation("input is required".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn tool_error_produces_502() {
        let err = AppError::from(clipforge_core::Error::tool("ffmpeg", "missing"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
