use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::core::error::{AppError, ResultExt};
use crate::core::extractor::AppJson;
use crate::features::assistants::dtos::{
    CreateAllAssistantForm, CreateAllAssistantResponseDto, CreateVectorDto,
    CreateVectorResponseDto, TrainModelDto, TrainModelResponseDto, UploadFilesDto,
    UploadFilesResponseDto, UploadedPart,
};
use crate::features::assistants::services::AssistantService;
use crate::shared::constants::{
    ERR_CREATE_ALL_ASSISTANT, ERR_CREATE_VECTOR_STORE, ERR_PROCESS_UPLOAD, ERR_UPLOAD_FILES,
    MSG_ASSISTANT_CREATED_AND_UPDATED, MSG_FILES_UPLOADED, MSG_FILE_UPLOADED,
    MSG_VECTOR_STORE_CREATED,
};
use crate::shared::types::ErrorResponse;

/// Upload training data sent inline in the request body
#[utoipa::path(
    post,
    path = "/train-model",
    tag = "files",
    request_body = TrainModelDto,
    responses(
        (status = 200, description = "File uploaded", body = TrainModelResponseDto),
        (status = 400, description = "fileName or data missing", body = ErrorResponse),
        (status = 413, description = "Body exceeds the upload size limit", body = ErrorResponse),
        (status = 500, description = "Upload failed", body = ErrorResponse)
    )
)]
pub async fn train_model(
    State(service): State<Arc<AssistantService>>,
    AppJson(dto): AppJson<TrainModelDto>,
) -> Result<Json<TrainModelResponseDto>, AppError> {
    let (file_name, data) = dto.into_parts()?;

    let result = service
        .upload_training_data(&file_name, data.as_bytes())
        .await
        .context(ERR_PROCESS_UPLOAD)?;

    Ok(Json(TrainModelResponseDto {
        message: MSG_FILE_UPLOADED.to_string(),
        result,
    }))
}

/// Create an empty vector store
#[utoipa::path(
    post,
    path = "/create-vector",
    tag = "files",
    request_body = CreateVectorDto,
    responses(
        (status = 200, description = "Vector store created", body = CreateVectorResponseDto),
        (status = 500, description = "Remote service error", body = ErrorResponse)
    )
)]
pub async fn create_vector(
    State(service): State<Arc<AssistantService>>,
    AppJson(dto): AppJson<CreateVectorDto>,
) -> Result<Json<CreateVectorResponseDto>, AppError> {
    let result = service
        .create_vector_store(&dto.name)
        .await
        .context(ERR_CREATE_VECTOR_STORE)?;

    Ok(Json(CreateVectorResponseDto {
        message: MSG_VECTOR_STORE_CREATED.to_string(),
        result,
    }))
}

/// Create a vector store from files already present on the server
#[utoipa::path(
    post,
    path = "/upload-files",
    tag = "files",
    request_body = UploadFilesDto,
    responses(
        (status = 200, description = "Files indexed", body = UploadFilesResponseDto),
        (status = 400, description = "files missing or not an array", body = ErrorResponse),
        (status = 500, description = "Missing file or remote service error", body = ErrorResponse)
    )
)]
pub async fn upload_files(
    State(service): State<Arc<AssistantService>>,
    AppJson(dto): AppJson<UploadFilesDto>,
) -> Result<Json<UploadFilesResponseDto>, AppError> {
    let paths: Vec<PathBuf> = dto.file_paths()?.into_iter().map(PathBuf::from).collect();

    let vector_store = service
        .upload_files_to_vector_store(&dto.name, &paths)
        .await
        .context(ERR_UPLOAD_FILES)?;

    Ok(Json(UploadFilesResponseDto {
        message: MSG_FILES_UPLOADED.to_string(),
        vector_store,
    }))
}

/// Create an assistant, index the uploaded files into a new vector store and
/// link the two.
///
/// Accepts multipart/form-data with:
/// - `name`: assistant name (required)
/// - `instructions`: assistant instructions
/// - `files`: one or more files (repeat the field)
#[utoipa::path(
    post,
    path = "/create-all-assistant",
    tag = "files",
    request_body(
        content = CreateAllAssistantForm,
        content_type = "multipart/form-data",
        description = "Assistant fields and the files to index",
    ),
    responses(
        (status = 200, description = "Assistant created and linked", body = CreateAllAssistantResponseDto),
        (status = 400, description = "No files or missing name", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "A workflow step failed", body = ErrorResponse)
    )
)]
pub async fn create_all_assistant(
    State(service): State<Arc<AssistantService>>,
    mut multipart: Multipart,
) -> Result<Json<CreateAllAssistantResponseDto>, AppError> {
    let mut name: Option<String> = None;
    let mut instructions = String::new();
    let mut parts: Vec<UploadedPart> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("multipart data", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        // Any part carrying a filename is a file, whatever its field name
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let data = field
                .bytes()
                .await
                .map_err(|e| multipart_error("file data", e))?;

            // An empty file input is sent as a nameless, zero-byte part
            if file_name.trim().is_empty() && data.is_empty() {
                debug!("Skipping empty file part: {}", field_name);
                continue;
            }

            parts.push(UploadedPart {
                file_name,
                data: data.to_vec(),
            });
            continue;
        }

        match field_name.as_str() {
            "name" | "instructions" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(&field_name, e))?;
                if field_name == "name" {
                    name = Some(text);
                } else {
                    instructions = text;
                }
            }
            _ => debug!("Ignoring unknown field: {}", field_name),
        }
    }

    if parts.is_empty() {
        return Err(AppError::ValidationFailed(
            "No files were uploaded".to_string(),
        ));
    }
    let name = name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::ValidationFailed("name is required".to_string()))?;

    let assistant = service
        .create_all_assistant(&name, &instructions, parts)
        .await
        .map_err(|e| {
            let message = format!("{}: {}", ERR_CREATE_ALL_ASSISTANT, e.root());
            e.context(message)
        })?;

    Ok(Json(CreateAllAssistantResponseDto {
        message: MSG_ASSISTANT_CREATED_AND_UPDATED.to_string(),
        assistant,
    }))
}

fn multipart_error(what: &str, e: MultipartError) -> AppError {
    debug!("Failed to read {}: {}", what, e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(format!(
            "Request body exceeds the upload size limit while reading {}",
            what
        ));
    }
    AppError::ValidationFailed(format!("Failed to read {}: {}", what, e.body_text()))
}
