/// Purpose tag for files uploaded for assistant use
pub const FILE_PURPOSE_ASSISTANTS: &str = "assistants";

/// Suffix appended to an assistant's name to name its vector store
pub const VECTOR_STORE_NAME_SUFFIX: &str = "-vector-store";

/// Role of every message created through this service
pub const MESSAGE_ROLE_USER: &str = "user";

// =============================================================================
// RESPONSE MESSAGES
// =============================================================================

pub const MSG_STREAMING_STARTED: &str = "Streaming started";
pub const MSG_FILE_UPLOADED: &str = "File uploaded successfully";
pub const MSG_VECTOR_STORE_CREATED: &str = "Vector store created successfully";
pub const MSG_FILES_UPLOADED: &str = "Files uploaded successfully";
pub const MSG_ASSISTANT_CREATED_AND_UPDATED: &str = "Assistant created and updated successfully";

pub const ERR_CREATE_ASSISTANT: &str = "Failed to create assistant";
pub const ERR_CREATE_THREAD: &str = "Failed to create thread";
pub const ERR_ADD_MESSAGE: &str = "Failed to add message to thread";
pub const ERR_START_STREAMING: &str = "Failed to start streaming";
pub const ERR_PROCESS_UPLOAD: &str = "Failed to process upload";
pub const ERR_CREATE_VECTOR_STORE: &str = "Failed to create vector store";
pub const ERR_UPLOAD_FILES: &str = "Failed to upload files";
pub const ERR_CREATE_ALL_ASSISTANT: &str = "Failed to create assistant with vector store";
