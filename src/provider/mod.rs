//! Backend abstraction for the managed thread/run variant.

pub mod http;
pub mod openai;

pub use openai::OpenAiAssistantsBackend;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::stream::EventStream;
use crate::types::{RunSummary, Sender, ToolCallResult};

/// Body of an assistant creation request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<serde_json::Value>,
}

/// Thread, message and run operations a [`RunSession`](crate::session::RunSession)
/// needs from the backend.
///
/// Streaming operations return decoded [`EventStream`]s; non-success HTTP
/// statuses surface as errors before any event is produced.
#[async_trait]
pub trait AssistantsBackend: Send + Sync {
    /// Create an assistant and return its id.
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<String>;

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()>;

    /// Create an empty thread and return its id.
    async fn create_thread(&self) -> Result<String>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Append a message to a thread. Rejected while a run on the thread is active.
    async fn create_message(&self, thread_id: &str, role: Sender, content: &str) -> Result<()>;

    /// Raw message objects of a thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<serde_json::Value>>;

    async fn list_runs(&self, thread_id: &str) -> Result<Vec<RunSummary>>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()>;

    /// Start a run of `assistant_id` on the thread and stream its events.
    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<EventStream>;

    /// Submit tool results for a run awaiting them and stream the continuation.
    async fn submit_tool_outputs_stream(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<EventStream>;
}
