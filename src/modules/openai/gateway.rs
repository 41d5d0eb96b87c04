use std::path::Path;

use async_trait::async_trait;

use crate::core::error::Result;
use crate::modules::openai::stream::RunEventStream;
use crate::modules::openai::types::{
    Assistant, FileObject, Message, Thread, VectorStore, VectorStoreFileBatch,
};

/// Operations of the remote assistants service used by this relay.
///
/// Every call goes straight to the remote side: nothing is retried or cached.
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    /// Create an assistant with file search enabled
    async fn create_assistant(&self, name: &str, instructions: &str) -> Result<Assistant>;

    /// Point the assistant's file search tool at `vector_store_id`
    async fn attach_vector_store(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<Assistant>;

    async fn create_thread(&self) -> Result<Thread>;

    /// Append a user message to a thread
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<Message>;

    /// Start a streamed run. Resolves once the remote side accepted the run.
    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream>;

    /// Upload a local file. Fails with `FileNotFound` when `path` does not exist.
    async fn upload_file(&self, path: &Path, purpose: &str) -> Result<FileObject>;

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore>;

    async fn create_file_batch(
        &self,
        vector_store_id: &str,
        file_ids: &[String],
    ) -> Result<VectorStoreFileBatch>;

    async fn retrieve_file_batch(
        &self,
        vector_store_id: &str,
        batch_id: &str,
    ) -> Result<VectorStoreFileBatch>;
}
