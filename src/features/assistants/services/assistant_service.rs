use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::core::error::{AppError, Result};
use crate::features::assistants::dtos::UploadedPart;
use crate::modules::openai::stream::pipe_run_events;
use crate::modules::openai::types::{
    Assistant, BatchStatus, FileObject, Message, Thread, VectorStore, VectorStoreFileBatch,
};
use crate::modules::openai::AssistantGateway;
use crate::modules::storage::{TempFile, TempFileStore};
use crate::shared::constants::{FILE_PURPOSE_ASSISTANTS, VECTOR_STORE_NAME_SUFFIX};

/// How long to wait on a vector store file batch
#[derive(Debug, Clone, Copy)]
pub struct BatchPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Service behind every assistants route
pub struct AssistantService {
    gateway: Arc<dyn AssistantGateway>,
    temp_store: TempFileStore,
    polling: BatchPolling,
}

impl AssistantService {
    pub fn new(
        gateway: Arc<dyn AssistantGateway>,
        temp_store: TempFileStore,
        polling: BatchPolling,
    ) -> Self {
        Self {
            gateway,
            temp_store,
            polling,
        }
    }

    pub async fn create_assistant(&self, name: &str, instructions: &str) -> Result<Assistant> {
        let assistant = self.gateway.create_assistant(name, instructions).await?;
        require_id("assistant", &assistant.id)?;
        Ok(assistant)
    }

    pub async fn create_thread(&self) -> Result<Thread> {
        let thread = self.gateway.create_thread().await?;
        debug!("Created thread {}", thread.id);
        Ok(thread)
    }

    pub async fn add_message(&self, thread_id: &str, content: &str) -> Result<Message> {
        self.gateway.add_message(thread_id, content).await
    }

    /// Open a run stream and print it to stdout in the background.
    ///
    /// Returns as soon as the remote side accepted the run; the output is not
    /// awaited and cannot be cancelled.
    pub async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<()> {
        let events = self.gateway.stream_run(thread_id, assistant_id).await?;

        let thread_id = thread_id.to_string();
        tokio::spawn(async move {
            match pipe_run_events(events, tokio::io::stdout()).await {
                Ok(summary) => match summary.failure {
                    Some(reason) => warn!("Run on thread {} failed: {}", thread_id, reason),
                    None => info!(
                        "Run stream on thread {} finished ({} events)",
                        thread_id, summary.events
                    ),
                },
                Err(e) => error!("Run stream on thread {} aborted: {}", thread_id, e),
            }
        });

        Ok(())
    }

    /// Write `data` to a temp file, upload it, and remove the temp file
    pub async fn upload_training_data(&self, file_name: &str, data: &[u8]) -> Result<FileObject> {
        let temp_file = self.temp_store.save(file_name, data).await?;

        let result = self
            .gateway
            .upload_file(temp_file.path(), FILE_PURPOSE_ASSISTANTS)
            .await;
        self.temp_store.remove(&temp_file).await;

        result
    }

    pub async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        self.gateway.create_vector_store(name).await
    }

    /// Create a vector store named `name` and index every file of `paths` in it.
    ///
    /// All paths are checked before anything is created remotely; the first
    /// missing one aborts with `FileNotFound`. Any upload or batch failure fails
    /// the whole call.
    pub async fn upload_files_to_vector_store(
        &self,
        name: &str,
        paths: &[PathBuf],
    ) -> Result<VectorStore> {
        for path in paths {
            let is_file = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(AppError::FileNotFound(path.display().to_string()));
            }
        }

        let vector_store = self.gateway.create_vector_store(name).await?;
        require_id("vector store", &vector_store.id)?;

        if paths.is_empty() {
            debug!("No files given for vector store {}", vector_store.id);
            return Ok(vector_store);
        }

        let mut file_ids = Vec::with_capacity(paths.len());
        for path in paths {
            let file = self
                .gateway
                .upload_file(path, FILE_PURPOSE_ASSISTANTS)
                .await?;
            file_ids.push(file.id);
        }

        let batch = self
            .gateway
            .create_file_batch(&vector_store.id, &file_ids)
            .await?;
        let batch = self.wait_for_batch(&vector_store.id, batch).await?;

        if batch.status != BatchStatus::Completed {
            return Err(AppError::RemoteService(format!(
                "File batch {} for vector store {} ended as {:?} ({} of {} files failed)",
                batch.id,
                vector_store.id,
                batch.status,
                batch.file_counts.failed,
                batch.file_counts.total
            )));
        }

        info!(
            "Indexed {} files into vector store {}",
            batch.file_counts.completed, vector_store.id
        );
        Ok(vector_store)
    }

    async fn wait_for_batch(
        &self,
        vector_store_id: &str,
        mut batch: VectorStoreFileBatch,
    ) -> Result<VectorStoreFileBatch> {
        let deadline = Instant::now() + self.polling.timeout;

        while !batch.status.is_terminal() {
            if Instant::now() >= deadline {
                return Err(AppError::RemoteService(format!(
                    "File batch {} still in progress after {:?}",
                    batch.id, self.polling.timeout
                )));
            }

            tokio::time::sleep(self.polling.interval).await;
            batch = self
                .gateway
                .retrieve_file_batch(vector_store_id, &batch.id)
                .await?;
            debug!(
                "File batch {}: {:?} ({}/{} completed)",
                batch.id, batch.status, batch.file_counts.completed, batch.file_counts.total
            );
        }

        Ok(batch)
    }

    /// Create an assistant whose file search covers the uploaded files.
    ///
    /// Steps run strictly in order: save files, create assistant, build the
    /// vector store, attach it. Nothing created remotely is rolled back when a
    /// later step fails. Temp files are always removed.
    pub async fn create_all_assistant(
        &self,
        name: &str,
        instructions: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<Assistant> {
        if parts.is_empty() {
            return Err(AppError::ValidationFailed(
                "No files were uploaded".to_string(),
            ));
        }

        let mut temp_files: Vec<TempFile> = Vec::with_capacity(parts.len());
        for part in &parts {
            match self.temp_store.save(&part.file_name, &part.data).await {
                Ok(file) => temp_files.push(file),
                Err(e) => {
                    self.temp_store.remove_all(&temp_files).await;
                    return Err(e);
                }
            }
        }

        let result = self
            .build_assistant_with_files(name, instructions, &temp_files)
            .await;
        self.temp_store.remove_all(&temp_files).await;

        result
    }

    async fn build_assistant_with_files(
        &self,
        name: &str,
        instructions: &str,
        temp_files: &[TempFile],
    ) -> Result<Assistant> {
        let assistant = self.create_assistant(name, instructions).await?;

        let paths: Vec<PathBuf> = temp_files.iter().map(|f| f.path().to_path_buf()).collect();
        let vector_store_name = format!("{}{}", name, VECTOR_STORE_NAME_SUFFIX);
        let vector_store = self
            .upload_files_to_vector_store(&vector_store_name, &paths)
            .await?;

        let updated = self
            .gateway
            .attach_vector_store(&assistant.id, &vector_store.id)
            .await?;
        require_id("updated assistant", &updated.id)?;

        info!(
            "Assistant {} ready with vector store {}",
            updated.id, vector_store.id
        );
        Ok(updated)
    }
}

fn require_id(kind: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(AppError::RemoteService(format!(
            "Remote service returned a {} without an id",
            kind
        )));
    }
    Ok(())
}
