use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::sync::Arc;

use crate::features::assistants::handlers::{
    add_message, create_all_assistant, create_assistant, create_thread, create_vector,
    stream_run, train_model, upload_files,
};
use crate::features::assistants::services::AssistantService;

/// Allowance for multipart boundaries and headers on top of the payload limit
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the assistants feature
pub fn routes(service: Arc<AssistantService>, max_upload_size: usize) -> Router {
    Router::new()
        .route("/create-assistant", post(create_assistant))
        .route("/create-thread", post(create_thread))
        .route("/add-message", post(add_message))
        .route("/stream-run", post(stream_run))
        .route(
            "/train-model",
            post(train_model).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/create-vector", post(create_vector))
        .route("/upload-files", post(upload_files))
        .route(
            "/create-all-assistant",
            post(create_all_assistant)
                .layer(DefaultBodyLimit::max(max_upload_size + MULTIPART_OVERHEAD)),
        )
        .with_state(service)
}
