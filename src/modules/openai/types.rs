//! Wire shapes of the assistants API.
//!
//! Only the fields the relay reads are typed; everything else is kept in
//! `extra` so responses can be handed back to clients unchanged. Typed
//! optional fields are always written back, as `null` when unset.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Vec<AssistantTool>,
    #[serde(default)]
    pub tool_resources: Option<ToolResources>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl Assistant {
    /// Vector stores referenced by the file search tool
    pub fn vector_store_ids(&self) -> &[String] {
        self.tool_resources
            .as_ref()
            .and_then(|r| r.file_search.as_ref())
            .map(|fs| fs.vector_store_ids.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssistantTool {
    /// Tool type, e.g. `file_search` or `code_interpreter`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl AssistantTool {
    pub fn file_search() -> Self {
        Self {
            kind: "file_search".to_string(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolResources {
    #[serde(default)]
    pub file_search: Option<FileSearchResources>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl ToolResources {
    pub fn file_search(vector_store_ids: Vec<String>) -> Self {
        Self {
            file_search: Some(FileSearchResources { vector_store_ids }),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileSearchResources {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub tools: Vec<AssistantTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModifyAssistantRequest {
    pub tool_resources: ToolResources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Thread {
    pub id: String,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
    pub stream: bool,
}

/// A file stored on the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub file_counts: Option<FileCounts>,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileCounts {
    #[serde(default)]
    pub in_progress: u32,
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub cancelled: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVectorStoreRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFileBatchRequest<'a> {
    pub file_ids: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreFileBatch {
    pub id: String,
    #[serde(default)]
    pub vector_store_id: Option<String>,
    pub status: BatchStatus,
    #[serde(default)]
    pub file_counts: FileCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BatchStatus::InProgress)
    }
}

/// Error envelope of a non-2xx response
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
