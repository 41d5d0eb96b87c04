use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::core::error::AppError;
use crate::modules::openai::types::{Assistant, FileObject, Message, Thread, VectorStore};

/// Request DTO for creating an assistant
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssistantDto {
    /// Display name of the assistant
    #[validate(length(min = 1, message = "name is required"))]
    #[schema(example = "Support bot")]
    pub name: String,
    /// System instructions for the assistant
    #[serde(default)]
    #[schema(example = "Answer questions using the attached documents")]
    pub instructions: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssistantResponseDto {
    pub assistant: Assistant,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponseDto {
    pub thread: Thread,
}

/// Request DTO for appending a user message to a thread.
/// Content is forwarded as-is.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageDto {
    #[schema(example = "thread_abc123")]
    pub thread_id: String,
    #[serde(default)]
    #[schema(example = "What are your opening hours?")]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponseDto {
    pub message: Message,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamRunDto {
    #[schema(example = "thread_abc123")]
    pub thread_id: String,
    #[schema(example = "asst_abc123")]
    pub assistant_id: String,
}

/// Request DTO for uploading training data.
/// Both fields are required; they are optional here so that a missing field
/// is reported as a validation error rather than a JSON rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainModelDto {
    #[schema(example = "faq.json")]
    pub file_name: Option<String>,
    #[schema(example = "[{\"question\":\"...\",\"answer\":\"...\"}]")]
    pub data: Option<String>,
}

impl TrainModelDto {
    /// Returns `(file_name, data)` when both are present and non-empty
    pub fn into_parts(self) -> Result<(String, String), AppError> {
        match (self.file_name, self.data) {
            (Some(file_name), Some(data)) if !file_name.is_empty() && !data.is_empty() => {
                Ok((file_name, data))
            }
            _ => Err(AppError::ValidationFailed(
                "fileName and data are required in the request body".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrainModelResponseDto {
    #[schema(example = "File uploaded successfully")]
    pub message: String,
    pub result: FileObject,
}

/// Request DTO for creating a vector store; the name is optional remotely
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateVectorDto {
    #[serde(default)]
    #[schema(example = "support-docs")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateVectorResponseDto {
    #[schema(example = "Vector store created successfully")]
    pub message: String,
    pub result: VectorStore,
}

/// Request DTO for populating a new vector store from server-side paths.
/// `files` is kept untyped so that a wrong shape is a 400, not a JSON rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UploadFilesDto {
    #[serde(default)]
    #[schema(example = "support-docs")]
    pub name: String,
    #[schema(value_type = Option<Vec<String>>, example = json!(["/data/faq.json"]))]
    pub files: Option<Value>,
}

impl UploadFilesDto {
    /// Returns the file paths when `files` is an array of strings
    pub fn file_paths(&self) -> Result<Vec<String>, AppError> {
        let invalid = || {
            AppError::ValidationFailed(
                "files is required and must be an array of file paths".to_string(),
            )
        };

        let files = self.files.as_ref().and_then(Value::as_array).ok_or_else(invalid)?;

        files
            .iter()
            .map(|f| f.as_str().map(str::to_string).ok_or_else(invalid))
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFilesResponseDto {
    #[schema(example = "Files uploaded successfully")]
    pub message: String,
    pub vector_store: VectorStore,
}

/// Multipart form for creating an assistant backed by a new vector store.
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateAllAssistantForm {
    /// Display name; the vector store is named `<name>-vector-store`
    pub name: String,
    pub instructions: String,
    /// File to index; repeat the field to send several files
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAllAssistantResponseDto {
    #[schema(example = "Assistant created and updated successfully")]
    pub message: String,
    pub assistant: Assistant,
}

/// A file part received in a multipart request
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub file_name: String,
    pub data: Vec<u8>,
}
