use axum::extract::{rejection::JsonRejection, FromRequest};
use axum::http::StatusCode;

use crate::core::error::AppError;

/// JSON body extractor whose rejections use the `{error, code}` body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }

        let message = match rejection {
            JsonRejection::JsonDataError(e) => format!("Invalid request body: {}", e.body_text()),
            JsonRejection::JsonSyntaxError(e) => format!("Malformed JSON: {}", e.body_text()),
            JsonRejection::MissingJsonContentType(_) => {
                "Expected a request with `Content-Type: application/json`".to_string()
            }
            other => other.body_text(),
        };

        AppError::ValidationFailed(message)
    }
}
