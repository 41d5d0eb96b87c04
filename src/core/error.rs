use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Replaces the user-facing message while keeping the kind of `source`
    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Underlying error, skipping any context wrappers
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self.root() {
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::RemoteService(_) => "REMOTE_SERVICE_ERROR",
            AppError::FileNotFound(_) => "FILE_NOT_FOUND",
            AppError::Io(_) => "IO_ERROR",
            AppError::Context { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.root() {
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn context(self, message: impl Into<String>) -> Self {
        AppError::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

/// Attach a user-facing message to an error result
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match self.root() {
            AppError::ValidationFailed(msg) | AppError::PayloadTooLarge(msg) => msg.clone(),
            _ => match &self {
                AppError::Context { message, source } => {
                    tracing::error!("{}: {}", message, source);
                    message.clone()
                }
                other => {
                    tracing::error!("Unhandled error: {}", other);
                    other.to_string()
                }
            },
        };

        let body = Json(ErrorResponse::new(message, code));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_root_kind() {
        let err = AppError::ValidationFailed("name is required".to_string())
            .context("Failed to create assistant");

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_remote_and_io_errors_map_to_500() {
        let remote = AppError::RemoteService("boom".to_string());
        assert_eq!(remote.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(remote.code(), "REMOTE_SERVICE_ERROR");

        let io = AppError::from(std::io::Error::other("disk full")).context("upload");
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.code(), "IO_ERROR");

        let missing = AppError::FileNotFound("/tmp/none.json".to_string());
        assert_eq!(missing.code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_nested_context_resolves_to_innermost() {
        let err = AppError::RemoteService("no such thread".to_string())
            .context("inner")
            .context("outer");

        assert!(matches!(err.root(), AppError::RemoteService(_)));
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_context_message_hides_remote_detail() {
        let response = AppError::RemoteService("HTTP 404 - No thread found".to_string())
            .context("Failed to add message to thread")
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to add message to thread");
        assert_eq!(body["code"], "REMOTE_SERVICE_ERROR");
    }

    #[tokio::test]
    async fn test_wrapped_validation_keeps_its_message() {
        let response = AppError::ValidationFailed("name is required".to_string())
            .context("Failed to create assistant")
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "name is required");
    }

    #[tokio::test]
    async fn test_payload_too_large_is_413() {
        let err = AppError::PayloadTooLarge("length limit exceeded".to_string())
            .context("Failed to process upload");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["error"], "length limit exceeded");
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    }
}
