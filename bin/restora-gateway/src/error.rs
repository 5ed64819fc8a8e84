//! Unified gateway error type.
//!
//! Every handler returns `Result<T, GatewayError>`. Caller mistakes map to
//! 4xx with their detail; backend failures map to 5xx so the processing
//! service can tell a rejected upload from an unavailable store.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use restora_fetch::FetchError;
use restora_types::{ErrorBody, ErrorKind};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad key, bad body, or an oversized upload.
    #[error("{0}")]
    Validation(String),

    /// Missing local artifact or missing object.
    #[error("{0}")]
    NotFound(String),

    /// URL ingress could not pull the source.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The object store refused or failed the write.
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// Startup misconfiguration (store construction).
    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::Fetch(FetchError::InvalidUrl { .. } | FetchError::TooLarge { .. }) => {
                ErrorKind::Validation
            }
            GatewayError::Fetch(_) => ErrorKind::Fetch,
            GatewayError::StorageWrite(_) => ErrorKind::StorageWrite,
            GatewayError::Config(_) | GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Fetch(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Fetch => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            GatewayError::Config(_) | GatewayError::Internal(_) => {
                error!(error = %self, "internal gateway error");
                "internal server error".to_owned()
            }
            GatewayError::StorageWrite(_) => {
                error!(error = %self, "object store write failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(e: JsonRejection) -> Self {
        GatewayError::Validation(e.body_text())
    }
}

impl From<MultipartError> for GatewayError {
    fn from(e: MultipartError) -> Self {
        GatewayError::Validation(format!("failed to read multipart body: {}", e.body_text()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn caller_mistakes_are_client_errors() {
        assert_eq!(GatewayError::Validation("bad key".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::NotFound("gone".into()).status(), StatusCode::NOT_FOUND);
        let too_large = GatewayError::Fetch(FetchError::TooLarge { url: "http://x".into(), limit: 1 });
        assert_eq!(too_large.kind(), ErrorKind::Validation);
        assert_eq!(too_large.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_are_gateway_errors() {
        let status = GatewayError::Fetch(FetchError::Status { url: "http://x".into(), status: 404 });
        assert_eq!(status.status(), StatusCode::BAD_GATEWAY);
        let timeout = GatewayError::Fetch(FetchError::Timeout { url: "http://x".into(), secs: 3 });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.kind(), ErrorKind::Fetch);
    }

    #[test]
    fn backend_failures_are_server_errors() {
        let e = GatewayError::StorageWrite("bucket missing".into());
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.kind(), ErrorKind::StorageWrite);
    }
}
