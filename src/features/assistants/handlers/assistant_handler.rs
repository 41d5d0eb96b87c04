use std::sync::Arc;

use axum::{extract::State, Json};
use validator::Validate;

use crate::core::error::{AppError, ResultExt};
use crate::core::extractor::AppJson;
use crate::features::assistants::dtos::{
    AddMessageDto, AssistantResponseDto, CreateAssistantDto, MessageResponseDto, StreamRunDto,
    ThreadResponseDto,
};
use crate::features::assistants::services::AssistantService;
use crate::shared::constants::{
    ERR_ADD_MESSAGE, ERR_CREATE_ASSISTANT, ERR_CREATE_THREAD, ERR_START_STREAMING,
    MSG_STREAMING_STARTED,
};
use crate::shared::types::{ErrorResponse, MessageResponse};

/// Create an assistant with file search enabled
#[utoipa::path(
    post,
    path = "/create-assistant",
    tag = "assistants",
    request_body = CreateAssistantDto,
    responses(
        (status = 200, description = "Assistant created", body = AssistantResponseDto),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Remote service error", body = ErrorResponse)
    )
)]
pub async fn create_assistant(
    State(service): State<Arc<AssistantService>>,
    AppJson(dto): AppJson<CreateAssistantDto>,
) -> Result<Json<AssistantResponseDto>, AppError> {
    dto.validate()
        .map_err(|e| AppError::ValidationFailed(format!("Invalid request: {}", e)))?;

    let assistant = service
        .create_assistant(&dto.name, &dto.instructions)
        .await
        .context(ERR_CREATE_ASSISTANT)?;

    Ok(Json(AssistantResponseDto { assistant }))
}

/// Create an empty conversation thread
#[utoipa::path(
    post,
    path = "/create-thread",
    tag = "assistants",
    responses(
        (status = 200, description = "Thread created", body = ThreadResponseDto),
        (status = 500, description = "Remote service error", body = ErrorResponse)
    )
)]
pub async fn create_thread(
    State(service): State<Arc<AssistantService>>,
) -> Result<Json<ThreadResponseDto>, AppError> {
    let thread = service.create_thread().await.context(ERR_CREATE_THREAD)?;

    Ok(Json(ThreadResponseDto { thread }))
}

/// Append a user message to a thread
#[utoipa::path(
    post,
    path = "/add-message",
    tag = "assistants",
    request_body = AddMessageDto,
    responses(
        (status = 200, description = "Message added", body = MessageResponseDto),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Remote service error", body = ErrorResponse)
    )
)]
pub async fn add_message(
    State(service): State<Arc<AssistantService>>,
    AppJson(dto): AppJson<AddMessageDto>,
) -> Result<Json<MessageResponseDto>, AppError> {
    let message = service
        .add_message(&dto.thread_id, &dto.content)
        .await
        .context(ERR_ADD_MESSAGE)?;

    Ok(Json(MessageResponseDto { message }))
}

/// Start a streamed run of an assistant on a thread.
///
/// Responds once the run is accepted; the streamed output goes to the server
/// console, not to this response.
#[utoipa::path(
    post,
    path = "/stream-run",
    tag = "assistants",
    request_body = StreamRunDto,
    responses(
        (status = 200, description = "Streaming started", body = MessageResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Remote service error", body = ErrorResponse)
    )
)]
pub async fn stream_run(
    State(service): State<Arc<AssistantService>>,
    AppJson(dto): AppJson<StreamRunDto>,
) -> Result<Json<MessageResponse>, AppError> {
    service
        .start_run(&dto.thread_id, &dto.assistant_id)
        .await
        .context(ERR_START_STREAMING)?;

    Ok(Json(MessageResponse::new(MSG_STREAMING_STARTED)))
}
