use utoipa::{Modify, OpenApi};

use crate::features::assistants::{dtos, handlers};
use crate::modules::openai::types::{
    Assistant, AssistantTool, FileCounts, FileObject, FileSearchResources, Message, Thread,
    ToolResources, VectorStore,
};
use crate::shared::types::{ErrorResponse, MessageResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Assistants
        handlers::create_assistant,
        handlers::create_thread,
        handlers::add_message,
        handlers::stream_run,
        // Files and vector stores
        handlers::train_model,
        handlers::create_vector,
        handlers::upload_files,
        handlers::create_all_assistant,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            // Remote objects
            Assistant,
            AssistantTool,
            ToolResources,
            FileSearchResources,
            Thread,
            Message,
            FileObject,
            VectorStore,
            FileCounts,
            // Assistants DTOs
            dtos::CreateAssistantDto,
            dtos::AssistantResponseDto,
            dtos::ThreadResponseDto,
            dtos::AddMessageDto,
            dtos::MessageResponseDto,
            dtos::StreamRunDto,
            // Files DTOs
            dtos::TrainModelDto,
            dtos::TrainModelResponseDto,
            dtos::CreateVectorDto,
            dtos::CreateVectorResponseDto,
            dtos::UploadFilesDto,
            dtos::UploadFilesResponseDto,
            dtos::CreateAllAssistantForm,
            dtos::CreateAllAssistantResponseDto,
        )
    ),
    tags(
        (name = "assistants", description = "Assistants, threads, messages and runs"),
        (name = "files", description = "File uploads and vector stores"),
    ),
    info(
        title = "Assistant Relay API",
        version = "0.1.0",
        description = "HTTP relay for the OpenAI assistants API",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
