//! Shared test helpers: SSE bodies and a scripted backend.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use courier::error::{CourierError, Result};
use courier::provider::{AssistantsBackend, CreateAssistantRequest};
use courier::stream::EventStream;
use courier::types::*;

/// Render assistant-run objects as an SSE body terminated by `[DONE]`.
pub fn sse(objects: &[Value]) -> String {
    let mut body = String::new();
    for object in objects {
        let event = object["object"].as_str().unwrap_or("message");
        body.push_str(&format!("event: {event}\ndata: {object}\n\n"));
    }
    body.push_str("event: done\ndata: [DONE]\n\n");
    body
}

/// Render completion chunks as an SSE body terminated by `[DONE]`.
pub fn completion_sse(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn run_object(id: &str, status: &str) -> Value {
    json!({"id": id, "object": "thread.run", "status": status, "last_error": null})
}

pub fn requires_action(run_id: &str, calls: Value) -> Value {
    json!({
        "id": run_id,
        "object": "thread.run",
        "status": "requires_action",
        "required_action": {"type": "submit_tool_outputs", "submit_tool_outputs": {"tool_calls": calls}}
    })
}

pub fn message_delta(text: &str) -> Value {
    json!({
        "id": "msg_1",
        "object": "thread.message.delta",
        "delta": {"content": [{"index": 0, "type": "text", "text": {"value": text}}]}
    })
}

pub fn message_done(text: &str) -> Value {
    json!({
        "id": "msg_1",
        "object": "thread.message",
        "status": "completed",
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    })
}

pub fn function_call(id: &str, name: &str, args: Value) -> Value {
    json!({"id": id, "type": "function", "function": {"name": name, "arguments": args.to_string()}})
}

/// Stream that yields `events` and then ends.
pub fn finite(events: Vec<StreamEvent>) -> EventStream {
    futures::stream::iter(events.into_iter().map(Ok)).boxed()
}

/// Stream that yields `events` and then stays open.
pub fn hanging(events: Vec<StreamEvent>) -> EventStream {
    futures::stream::iter(events.into_iter().map(Ok))
        .chain(futures::stream::pending())
        .boxed()
}

pub fn run_identified(id: &str, status: RunStatus) -> StreamEvent {
    StreamEvent::RunIdentified {
        run_id: id.to_string(),
        status,
    }
}

pub fn text(text: &str) -> StreamEvent {
    StreamEvent::TextDelta {
        text: text.to_string(),
    }
}

pub fn tool_request(run_id: &str, names: &[&str]) -> StreamEvent {
    StreamEvent::RequiresAction {
        run_id: run_id.to_string(),
        tool_calls: names
            .iter()
            .enumerate()
            .map(|(i, name)| ToolCall::function(format!("call_{i}"), *name, "{}"))
            .collect(),
    }
}

/// Backend whose responses are queued by the test; every call is recorded.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<String>>,
    message_errors: Mutex<VecDeque<CourierError>>,
    submit_errors: Mutex<VecDeque<CourierError>>,
    streams: Mutex<VecDeque<EventStream>>,
    runs: Mutex<Vec<RunSummary>>,
    submitted: Mutex<Vec<Vec<ToolCallResult>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream for the next `stream_run` or `submit_tool_outputs_stream`.
    pub fn queue_stream(&self, stream: EventStream) {
        self.streams.lock().unwrap().push_back(stream);
    }

    pub fn fail_next_message(&self, error: CourierError) {
        self.message_errors.lock().unwrap().push_back(error);
    }

    pub fn fail_next_submit(&self, error: CourierError) {
        self.submit_errors.lock().unwrap().push_back(error);
    }

    pub fn set_runs(&self, runs: Vec<RunSummary>) {
        *self.runs.lock().unwrap() = runs;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn submitted(&self) -> Vec<Vec<ToolCallResult>> {
        self.submitted.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_stream(&self) -> Result<EventStream> {
        self.streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CourierError::InvalidState("no stream queued".into()))
    }
}

#[async_trait]
impl AssistantsBackend for MockBackend {
    async fn create_assistant(&self, request: &CreateAssistantRequest) -> Result<String> {
        self.record(format!("create_assistant:{}", request.name));
        Ok("asst_mock".into())
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        self.record(format!("delete_assistant:{assistant_id}"));
        Ok(())
    }

    async fn create_thread(&self) -> Result<String> {
        self.record("create_thread".into());
        Ok("thread_mock".into())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.record(format!("delete_thread:{thread_id}"));
        Ok(())
    }

    async fn create_message(&self, _thread_id: &str, role: Sender, content: &str) -> Result<()> {
        self.record(format!("create_message:{role:?}:{content}"));
        match self.message_errors.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<Value>> {
        self.record("list_messages".into());
        Ok(Vec::new())
    }

    async fn list_runs(&self, _thread_id: &str) -> Result<Vec<RunSummary>> {
        self.record("list_runs".into());
        Ok(self.runs.lock().unwrap().clone())
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<()> {
        self.record(format!("cancel_run:{run_id}"));
        Ok(())
    }

    async fn stream_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<EventStream> {
        self.record("stream_run".into());
        self.next_stream()
    }

    async fn submit_tool_outputs_stream(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<EventStream> {
        self.record(format!("submit:{run_id}"));
        self.submitted.lock().unwrap().push(outputs.to_vec());
        if let Some(err) = self.submit_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.next_stream()
    }
}
