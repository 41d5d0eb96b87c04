//! In-memory stand-in for the assistants API

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::json;

use crate::core::error::{AppError, Result};
use crate::modules::openai::stream::{decode_run_events, RunEventStream};
use crate::modules::openai::types::{
    Assistant, BatchStatus, FileObject, Message, Thread, VectorStore, VectorStoreFileBatch,
};
use crate::modules::openai::AssistantGateway;

/// Records every call in order and answers with canned objects.
/// Operations listed with [`FakeGateway::failing`] return a remote error.
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
    batch_statuses: Mutex<VecDeque<BatchStatus>>,
    uploaded: Mutex<Vec<String>>,
    vector_store_names: Mutex<Vec<String>>,
    empty_assistant_id: bool,
}

impl FakeGateway {
    pub const ASSISTANT_ID: &'static str = "asst_fake";
    pub const VECTOR_STORE_ID: &'static str = "vs_fake";
    pub const THREAD_ID: &'static str = "thread_fake";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, operation: &str) -> Self {
        self.failing.insert(operation.to_string());
        self
    }

    /// Statuses returned by successive `retrieve_file_batch` calls (then `completed`)
    pub fn with_batch_statuses(self, statuses: Vec<BatchStatus>) -> Self {
        *self.batch_statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_empty_assistant_id(mut self) -> Self {
        self.empty_assistant_id = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uploaded_file_names(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn vector_store_names(&self) -> Vec<String> {
        self.vector_store_names.lock().unwrap().clone()
    }

    fn record(&self, operation: &str) -> Result<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.failing.contains(operation) {
            return Err(AppError::RemoteService(format!("{} rejected", operation)));
        }
        Ok(())
    }

    fn assistant(&self, name: Option<&str>, vector_store_id: Option<&str>) -> Assistant {
        let id = if self.empty_assistant_id {
            ""
        } else {
            Self::ASSISTANT_ID
        };
        let mut raw = json!({
            "id": id,
            "object": "assistant",
            "model": "gpt-4o",
            "tools": [{ "type": "file_search" }]
        });
        if let Some(name) = name {
            raw["name"] = json!(name);
        }
        if let Some(vs) = vector_store_id {
            raw["tool_resources"] = json!({ "file_search": { "vector_store_ids": [vs] } });
        }
        serde_json::from_value(raw).unwrap()
    }

    fn batch(status: BatchStatus) -> VectorStoreFileBatch {
        VectorStoreFileBatch {
            id: "vsfb_fake".to_string(),
            vector_store_id: Some(Self::VECTOR_STORE_ID.to_string()),
            status,
            file_counts: Default::default(),
        }
    }
}

#[async_trait]
impl AssistantGateway for FakeGateway {
    async fn create_assistant(&self, name: &str, _instructions: &str) -> Result<Assistant> {
        self.record("create_assistant")?;
        Ok(self.assistant(Some(name), None))
    }

    async fn attach_vector_store(
        &self,
        _assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<Assistant> {
        self.record("attach_vector_store")?;
        Ok(self.assistant(None, Some(vector_store_id)))
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.record("create_thread")?;
        Ok(serde_json::from_value(json!({ "id": Self::THREAD_ID, "object": "thread" })).unwrap())
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<Message> {
        self.record("add_message")?;
        Ok(serde_json::from_value(json!({
            "id": "msg_fake",
            "object": "thread.message",
            "thread_id": thread_id,
            "role": "user",
            "content": [{ "type": "text", "text": { "value": content, "annotations": [] } }]
        }))
        .unwrap())
    }

    async fn stream_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<RunEventStream> {
        self.record("stream_run")?;
        let body = "event: thread.message.created\ndata: {}\n\nevent: done\ndata: [DONE]\n\n";
        Ok(decode_run_events(stream::iter(vec![Ok::<_, std::io::Error>(
            body.as_bytes().to_vec(),
        )])))
    }

    async fn upload_file(&self, path: &Path, purpose: &str) -> Result<FileObject> {
        self.record("upload_file")?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.uploaded.lock().unwrap().push(name.clone());

        if !path.exists() {
            return Err(AppError::FileNotFound(path.display().to_string()));
        }

        let index = self.uploaded.lock().unwrap().len();
        Ok(serde_json::from_value(json!({
            "id": format!("file-{}", index),
            "object": "file",
            "filename": name,
            "purpose": purpose
        }))
        .unwrap())
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        self.record("create_vector_store")?;
        self.vector_store_names.lock().unwrap().push(name.to_string());
        Ok(serde_json::from_value(json!({
            "id": Self::VECTOR_STORE_ID,
            "object": "vector_store",
            "name": name,
            "status": "completed"
        }))
        .unwrap())
    }

    async fn create_file_batch(
        &self,
        _vector_store_id: &str,
        _file_ids: &[String],
    ) -> Result<VectorStoreFileBatch> {
        self.record("create_file_batch")?;
        Ok(Self::batch(BatchStatus::InProgress))
    }

    async fn retrieve_file_batch(
        &self,
        _vector_store_id: &str,
        _batch_id: &str,
    ) -> Result<VectorStoreFileBatch> {
        self.record("retrieve_file_batch")?;
        let status = self
            .batch_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BatchStatus::Completed);
        Ok(Self::batch(status))
    }
}
