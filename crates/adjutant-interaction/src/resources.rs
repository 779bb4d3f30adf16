//! Resource operations against the remote Assistants API.
//!
//! One operation per remote resource action, each a single round-trip
//! through the [`Transport`]. None of them retries internally.

use adjutant_core::{Result, RunStatus};
use serde::{Deserialize, Serialize};

use crate::transport::{ApiRequest, FileUpload, Transport};

/// Purpose tag attached to every uploaded file.
const FILE_PURPOSE: &str = "assistants";

/// Name used when the caller leaves the assistant name empty.
const DEFAULT_NAME: &str = "Assistant";
/// Instructions used when the caller supplies none.
const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant";

/// A tool granted to an assistant, identified by its wire name.
///
/// The vocabulary is deployment-dependent (`retrieval` vs `file_search`), so
/// the name is data rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Tool {
    /// The code-interpreter tool.
    pub fn code_interpreter() -> Self {
        Self {
            kind: "code_interpreter".to_string(),
        }
    }

    /// A tool with the given wire name (e.g. the configured file-search name).
    pub fn named(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Parameters for creating an assistant. Empty/absent fields fall back to
/// the client's defaults; empty lists are omitted from the payload entirely.
#[derive(Debug, Clone, Default)]
pub struct CreateAssistant {
    pub name: Option<String>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub tools: Vec<Tool>,
    pub file_ids: Vec<String>,
}

#[derive(Serialize)]
struct CreateAssistantPayload {
    model: String,
    name: String,
    instructions: String,
    // The remote API rejects an explicit empty list for these fields in
    // some configurations, so absence must round-trip as absence.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    file_ids: Vec<String>,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    file_ids: Vec<String>,
}

#[derive(Serialize)]
struct StartRunPayload<'a> {
    assistant_id: &'a str,
}

/// A created assistant, as returned by the remote API.
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// Current state of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<LastError>,
}

/// Error detail attached to a run that ended in a failure state.
#[derive(Debug, Clone, Deserialize)]
pub struct LastError {
    #[serde(default)]
    pub message: Option<String>,
}

impl Run {
    /// The reported error message, if the remote attached one.
    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_ref()?.message.as_deref()
    }
}

/// One message on a thread, as returned by `list_messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: Vec<MessageSegment>,
}

/// One content segment of a thread message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSegment {
    Text { text: TextValue },
    ImageFile { image_file: ImageFileRef },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageFileRef {
    pub file_id: String,
}

impl ThreadMessage {
    /// Concatenates the content segments in remote order: text verbatim,
    /// images as an `[Image: <file_id>]` placeholder.
    pub fn display_content(&self) -> String {
        let mut rendered = String::new();
        for segment in &self.content {
            match segment {
                MessageSegment::Text { text } => rendered.push_str(&text.value),
                MessageSegment::ImageFile { image_file } => {
                    rendered.push_str(&format!("[Image: {}]", image_file.file_id));
                }
            }
        }
        rendered
    }
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

/// Thin CRUD client over the remote resource actions.
pub struct AssistantsClient<T: Transport> {
    transport: T,
    default_model: String,
}

impl<T: Transport> AssistantsClient<T> {
    /// Wraps a transport; `default_model` fills in when a caller creates an
    /// assistant without picking a model.
    pub fn new(transport: T, default_model: impl Into<String>) -> Self {
        Self {
            transport,
            default_model: default_model.into(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Creates an assistant. Omits `tools` and `file_ids` when empty and
    /// applies the default model/name/instructions for absent fields.
    pub async fn create_assistant(&self, req: CreateAssistant) -> Result<Assistant> {
        let payload = CreateAssistantPayload {
            model: req
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.default_model.clone()),
            name: req
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            instructions: req
                .instructions
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            tools: req.tools,
            file_ids: req.file_ids,
        };

        let body = serde_json::to_value(&payload)?;
        let response = self
            .transport
            .send(ApiRequest::post_json("assistants", body))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Creates an empty conversation thread and returns its id.
    pub async fn create_thread(&self) -> Result<String> {
        let response = self.transport.send(ApiRequest::post_empty("threads")).await?;
        let created: Created = serde_json::from_value(response)?;
        Ok(created.id)
    }

    /// Uploads a file with the fixed "assistants" purpose; returns the
    /// remote file id.
    pub async fn upload_file(&self, bytes: Vec<u8>, display_name: &str) -> Result<String> {
        let upload = FileUpload {
            file_name: display_name.to_string(),
            bytes,
            purpose: FILE_PURPOSE.to_string(),
        };
        let response = self
            .transport
            .send(ApiRequest::post_multipart("files", upload))
            .await?;
        let created: Created = serde_json::from_value(response)?;
        Ok(created.id)
    }

    /// Posts a user message to the thread. `file_ids` is omitted when empty.
    pub async fn post_message(
        &self,
        thread_id: &str,
        content: &str,
        file_ids: Vec<String>,
    ) -> Result<()> {
        let payload = MessagePayload {
            role: "user",
            content,
            file_ids,
        };
        let body = serde_json::to_value(&payload)?;
        self.transport
            .send(ApiRequest::post_json(
                format!("threads/{}/messages", thread_id),
                body,
            ))
            .await?;
        Ok(())
    }

    /// Starts a run of the assistant against the thread; returns the run id.
    pub async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<String> {
        let body = serde_json::to_value(&StartRunPayload { assistant_id })?;
        let response = self
            .transport
            .send(ApiRequest::post_json(
                format!("threads/{}/runs", thread_id),
                body,
            ))
            .await?;
        let created: Created = serde_json::from_value(response)?;
        Ok(created.id)
    }

    /// Fetches the current state of a run.
    pub async fn fetch_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let response = self
            .transport
            .send(ApiRequest::get(format!(
                "threads/{}/runs/{}",
                thread_id, run_id
            )))
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Lists the thread's messages, newest first.
    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let response = self
            .transport
            .send(ApiRequest::get(format!("threads/{}/messages", thread_id)))
            .await?;
        let list: MessageList = serde_json::from_value(response)?;
        Ok(list.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{RequestBody, Transport};
    use adjutant_core::AdjutantError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport double that records requests and replays scripted responses.
    struct MockTransport {
        requests: Mutex<Vec<ApiRequest>>,
        responses: Mutex<VecDeque<Result<Value>>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<Value>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        fn recorded(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AdjutantError::internal("no scripted response left")))
        }
    }

    fn client(responses: Vec<Result<Value>>) -> AssistantsClient<MockTransport> {
        AssistantsClient::new(MockTransport::new(responses), "gpt-4")
    }

    fn json_body(request: &ApiRequest) -> &Value {
        match &request.body {
            RequestBody::Json(value) => value,
            other => panic!("expected JSON body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_assistant_omits_empty_tools_and_files() {
        let client = client(vec![Ok(json!({"id": "asst_1", "name": "Assistant"}))]);

        client.create_assistant(CreateAssistant::default()).await.unwrap();

        let requests = client.transport.recorded();
        let body = json_body(&requests[0]);
        assert_eq!(requests[0].path, "assistants");
        assert!(body.get("tools").is_none());
        assert!(body.get("file_ids").is_none());
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["name"], "Assistant");
        assert_eq!(body["instructions"], "You are a helpful assistant");
    }

    #[tokio::test]
    async fn create_assistant_includes_tools_and_files_when_present() {
        let client = client(vec![Ok(json!({"id": "asst_1", "name": "Helper"}))]);

        let assistant = client
            .create_assistant(CreateAssistant {
                name: Some("Helper".to_string()),
                model: Some("gpt-4o".to_string()),
                instructions: Some("Be terse".to_string()),
                tools: vec![Tool::code_interpreter(), Tool::named("retrieval")],
                file_ids: vec!["file_1".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(assistant.id, "asst_1");
        let requests = client.transport.recorded();
        let body = json_body(&requests[0]);
        assert_eq!(
            body["tools"],
            json!([{"type": "code_interpreter"}, {"type": "retrieval"}])
        );
        assert_eq!(body["file_ids"], json!(["file_1"]));
        assert_eq!(body["model"], "gpt-4o");
    }

    #[tokio::test]
    async fn create_thread_posts_empty_body() {
        let client = client(vec![Ok(json!({"id": "thread_1"}))]);

        let thread_id = client.create_thread().await.unwrap();

        assert_eq!(thread_id, "thread_1");
        let requests = client.transport.recorded();
        assert_eq!(requests[0].path, "threads");
        assert_eq!(requests[0].body, RequestBody::Empty);
    }

    #[tokio::test]
    async fn upload_file_is_multipart_with_assistants_purpose() {
        let client = client(vec![Ok(json!({"id": "file_1"}))]);

        let file_id = client.upload_file(b"data".to_vec(), "notes.txt").await.unwrap();

        assert_eq!(file_id, "file_1");
        let requests = client.transport.recorded();
        match &requests[0].body {
            RequestBody::Multipart(upload) => {
                assert_eq!(upload.purpose, "assistants");
                assert_eq!(upload.file_name, "notes.txt");
                assert_eq!(upload.bytes, b"data");
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn post_message_is_always_user_role() {
        let client = client(vec![Ok(json!({"id": "msg_1"}))]);

        client.post_message("thread_1", "hi", Vec::new()).await.unwrap();

        let requests = client.transport.recorded();
        let body = json_body(&requests[0]);
        assert_eq!(requests[0].path, "threads/thread_1/messages");
        assert_eq!(body["role"], "user");
        assert!(body.get("file_ids").is_none());
    }

    #[tokio::test]
    async fn fetch_run_decodes_status_and_error() {
        let client = client(vec![Ok(json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"message": "rate_limited"}
        }))]);

        let run = client.fetch_run("thread_1", "run_1").await.unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message(), Some("rate_limited"));
    }

    #[tokio::test]
    async fn list_messages_decodes_newest_first_data() {
        let client = client(vec![Ok(json!({
            "data": [
                {"role": "assistant", "content": [{"type": "text", "text": {"value": "newest"}}]},
                {"role": "user", "content": [{"type": "text", "text": {"value": "older"}}]}
            ]
        }))]);

        let messages = client.list_messages("thread_1").await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].display_content(), "newest");
    }

    #[test]
    fn display_content_preserves_segment_order() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": {"value": "See: "}},
                {"type": "image_file", "image_file": {"file_id": "img_1"}}
            ]
        }))
        .unwrap();

        assert_eq!(message.display_content(), "See: [Image: img_1]");
    }
}
