use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::core::config::OpenAIConfig;
use crate::core::error::{AppError, Result};
use crate::modules::openai::gateway::AssistantGateway;
use crate::modules::openai::stream::{decode_run_events, RunEventStream};
use crate::modules::openai::types::{
    ApiErrorBody, Assistant, AssistantTool, CreateAssistantRequest, CreateFileBatchRequest,
    CreateMessageRequest, CreateRunRequest, CreateVectorStoreRequest, FileObject, Message,
    ModifyAssistantRequest, Thread, ToolResources, VectorStore, VectorStoreFileBatch,
};
use crate::shared::constants::MESSAGE_ROLE_USER;

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VERSION: &str = "assistants=v2";

/// reqwest-backed client for the OpenAI assistants API
pub struct OpenAIClient {
    config: OpenAIConfig,
    http_client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::RemoteService(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("{} {}", method, url);

        self.http_client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header(BETA_HEADER, BETA_VERSION)
    }

    /// Send a request that must finish within the configured timeout and decode its body
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<T> {
        let response = builder
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                error!("{} request failed: {}", operation, e);
                AppError::RemoteService(format!("{} request failed: {}", operation, e))
            })?;

        let response = Self::ensure_success(operation, response).await?;

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse {} response: {}", operation, e);
            AppError::RemoteService(format!("Failed to parse {} response: {}", operation, e))
        })
    }

    async fn ensure_success(operation: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => match (parsed.error.kind, parsed.error.code) {
                (_, Some(code)) => format!("{} ({})", parsed.error.message, code),
                (Some(kind), None) => format!("{} ({})", parsed.error.message, kind),
                (None, None) => parsed.error.message,
            },
            Err(_) => body,
        };

        error!("OpenAI API error on {}: HTTP {} - {}", operation, status, detail);
        Err(AppError::RemoteService(format!(
            "{} failed: HTTP {} - {}",
            operation, status, detail
        )))
    }
}

#[async_trait]
impl AssistantGateway for OpenAIClient {
    async fn create_assistant(&self, name: &str, instructions: &str) -> Result<Assistant> {
        let tool_resources = if self.config.default_vector_store_ids.is_empty() {
            None
        } else {
            Some(ToolResources::file_search(
                self.config.default_vector_store_ids.clone(),
            ))
        };

        let body = CreateAssistantRequest {
            model: self.config.model.clone(),
            name: name.to_string(),
            instructions: instructions.to_string(),
            tools: vec![AssistantTool::file_search()],
            tool_resources,
        };

        let assistant: Assistant = self
            .send_json(
                "create assistant",
                self.request(Method::POST, "/assistants").json(&body),
            )
            .await?;

        info!("Created assistant {} ({})", assistant.id, name);
        Ok(assistant)
    }

    async fn attach_vector_store(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<Assistant> {
        let body = ModifyAssistantRequest {
            tool_resources: ToolResources::file_search(vec![vector_store_id.to_string()]),
        };

        let assistant: Assistant = self
            .send_json(
                "update assistant",
                self.request(Method::POST, &format!("/assistants/{}", assistant_id))
                    .json(&body),
            )
            .await?;

        info!(
            "Attached vector store {} to assistant {}",
            vector_store_id, assistant_id
        );
        Ok(assistant)
    }

    async fn create_thread(&self) -> Result<Thread> {
        self.send_json(
            "create thread",
            self.request(Method::POST, "/threads")
                .json(&serde_json::json!({})),
        )
        .await
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<Message> {
        debug!("Adding message to thread {}", thread_id);

        let body = CreateMessageRequest {
            role: MESSAGE_ROLE_USER,
            content,
        };

        self.send_json(
            "add message",
            self.request(Method::POST, &format!("/threads/{}/messages", thread_id))
                .json(&body),
        )
        .await
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        let body = CreateRunRequest {
            assistant_id,
            stream: true,
        };

        // No request timeout: the stream lasts as long as the remote run does
        let response = self
            .request(Method::POST, &format!("/threads/{}/runs", thread_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("stream run request failed: {}", e);
                AppError::RemoteService(format!("stream run request failed: {}", e))
            })?;

        let response = Self::ensure_success("stream run", response).await?;
        info!(
            "Run stream opened for thread {} with assistant {}",
            thread_id, assistant_id
        );

        Ok(decode_run_events(response.bytes_stream()))
    }

    async fn upload_file(&self, path: &Path, purpose: &str) -> Result<FileObject> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::FileNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let size = data.len();

        let form = multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part(
                "file",
                multipart::Part::bytes(data).file_name(file_name.clone()),
            );

        let file: FileObject = self
            .send_json(
                "upload file",
                self.request(Method::POST, "/files").multipart(form),
            )
            .await?;

        info!("Uploaded {} ({} bytes) as {}", file_name, size, file.id);
        Ok(file)
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        let vector_store: VectorStore = self
            .send_json(
                "create vector store",
                self.request(Method::POST, "/vector_stores")
                    .json(&CreateVectorStoreRequest { name }),
            )
            .await?;

        info!("Created vector store {} ({})", vector_store.id, name);
        Ok(vector_store)
    }

    async fn create_file_batch(
        &self,
        vector_store_id: &str,
        file_ids: &[String],
    ) -> Result<VectorStoreFileBatch> {
        self.send_json(
            "create file batch",
            self.request(
                Method::POST,
                &format!("/vector_stores/{}/file_batches", vector_store_id),
            )
            .json(&CreateFileBatchRequest { file_ids }),
        )
        .await
    }

    async fn retrieve_file_batch(
        &self,
        vector_store_id: &str,
        batch_id: &str,
    ) -> Result<VectorStoreFileBatch> {
        self.send_json(
            "retrieve file batch",
            self.request(
                Method::GET,
                &format!(
                    "/vector_stores/{}/file_batches/{}",
                    vector_store_id, batch_id
                ),
            ),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::openai::stream::RunEvent;
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{bearer_token, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, default_vector_store_ids: Vec<String>) -> OpenAIClient {
        OpenAIClient::new(OpenAIConfig {
            api_key: "test-api-key".to_string(),
            base_url: server.uri(),
            model: "gpt-4o".to_string(),
            default_vector_store_ids,
            request_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
            poll_timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_assistant_sends_file_search_config() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assistants"))
            .and(bearer_token("test-api-key"))
            .and(header("OpenAI-Beta", "assistants=v2"))
            .and(body_json(json!({
                "model": "gpt-4o",
                "name": "Support",
                "instructions": "Answer from the docs",
                "tools": [{ "type": "file_search" }],
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_default"] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_abc",
                "object": "assistant",
                "name": "Support",
                "model": "gpt-4o",
                "tools": [{ "type": "file_search" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let assistant = client(&server, vec!["vs_default".to_string()])
            .create_assistant("Support", "Answer from the docs")
            .await
            .unwrap();

        assert_eq!(assistant.id, "asst_abc");
        assert_eq!(assistant.extra.get("object"), Some(&json!("assistant")));
    }

    #[tokio::test]
    async fn test_add_message_to_unknown_thread_is_remote_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/t1/messages"))
            .and(body_json(json!({ "role": "user", "content": "hi" })))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "message": "No thread found with id 't1'.",
                    "type": "invalid_request_error",
                    "code": null
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server, vec![])
            .add_message("t1", "hi")
            .await
            .unwrap_err();

        match err {
            AppError::RemoteService(msg) => {
                assert!(msg.contains("404"));
                assert!(msg.contains("No thread found with id 't1'."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_attach_vector_store_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/assistants/asst_1"))
            .and(body_json(json!({
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_9"] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "asst_1",
                "tool_resources": { "file_search": { "vector_store_ids": ["vs_9"] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let assistant = client(&server, vec![])
            .attach_vector_store("asst_1", "vs_9")
            .await
            .unwrap();

        assert_eq!(assistant.vector_store_ids(), &["vs_9".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_missing_file_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, vec![])
            .upload_file(&dir.path().join("missing.json"), "assistants")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::FileNotFound(p) if p.ends_with("missing.json")));
    }

    #[tokio::test]
    async fn test_upload_file_returns_remote_file() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "file-1",
                "object": "file",
                "bytes": 13,
                "filename": "faq.json",
                "purpose": "assistants"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("faq.json");
        std::fs::write(&file_path, br#"{"q":"a"}"#).unwrap();

        let file = client(&server, vec![])
            .upload_file(&file_path, "assistants")
            .await
            .unwrap();

        assert_eq!(file.id, "file-1");
        assert_eq!(file.purpose.as_deref(), Some("assistants"));
    }

    #[tokio::test]
    async fn test_stream_run_decodes_events() {
        let server = MockServer::start().await;

        let sse = concat!(
            "event: thread.run.created\n",
            "data: {\"id\":\"run_1\"}\n\n",
            "event: thread.message.created\n",
            "data: {\"id\":\"msg_1\"}\n\n",
            "event: thread.message.delta\n",
            "data: {\"delta\":{\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"Hello\"}}]}}\n\n",
            "event: done\n",
            "data: [DONE]\n\n",
        );

        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .and(body_json(json!({ "assistant_id": "asst_1", "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let events: Vec<RunEvent> = client(&server, vec![])
            .stream_run("thread_1", "asst_1")
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                RunEvent::Other("thread.run.created".to_string()),
                RunEvent::MessageCreated,
                RunEvent::TextDelta("Hello".to_string()),
                RunEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_run_rejected_before_streaming() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/threads/thread_1/runs"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "No assistant found", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let result = client(&server, vec![])
            .stream_run("thread_1", "asst_missing")
            .await;

        assert!(matches!(result, Err(AppError::RemoteService(msg)) if msg.contains("No assistant found")));
    }

    #[tokio::test]
    async fn test_file_batch_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vector_stores/vs_1/file_batches"))
            .and(body_json(json!({ "file_ids": ["file-1", "file-2"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "vsfb_1",
                "vector_store_id": "vs_1",
                "status": "in_progress"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/vector_stores/vs_1/file_batches/vsfb_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "vsfb_1",
                "vector_store_id": "vs_1",
                "status": "completed",
                "file_counts": { "in_progress": 0, "completed": 2, "failed": 0, "cancelled": 0, "total": 2 }
            })))
            .mount(&server)
            .await;

        let client = client(&server, vec![]);
        let ids = vec!["file-1".to_string(), "file-2".to_string()];
        let batch = client.create_file_batch("vs_1", &ids).await.unwrap();
        assert!(!batch.status.is_terminal());

        let batch = client.retrieve_file_batch("vs_1", &batch.id).await.unwrap();
        assert_eq!(batch.file_counts.completed, 2);
    }
}
