//! Interpretation of chat-completions stream chunks.

use serde_json::Value;

use crate::types::{StreamEvent, StreamFault};

pub(crate) const STOP_REASON: &str = "stop";
pub(crate) const ERROR_REASON: &str = "error";

const UNKNOWN_ERROR: &str = "unknown stream error";

/// Map one chunk to its events, in emission order. Chunks without
/// `choices`/`delta` are ignored.
///
/// A `stop` chunk may still carry the last token; its text comes before `StreamEnd`.
pub(crate) fn interpret(value: &Value) -> Vec<StreamEvent> {
    let Some(choice) = value.get("choices").and_then(|c| c.get(0)) else {
        return value.get("error").map(remote_error).into_iter().collect();
    };
    let delta = choice.get("delta");

    match choice.get("finish_reason").and_then(Value::as_str) {
        Some(STOP_REASON) => {
            let mut events: Vec<_> = delta.and_then(text_delta).into_iter().collect();
            events.push(StreamEvent::StreamEnd);
            return events;
        }
        Some(ERROR_REASON) => {
            let error = choice.get("error").or_else(|| value.get("error"));
            return vec![remote_error(error.unwrap_or(&Value::Null))];
        }
        _ => {}
    }

    let Some(delta) = delta else {
        return Vec::new();
    };
    let carries_tool_calls = delta.get("tool_calls").is_some_and(|calls| !calls.is_null());
    let is_tool_role = delta.get("role").and_then(Value::as_str) == Some("tool");
    if carries_tool_calls || is_tool_role {
        return vec![StreamEvent::ToolMessage {
            message: delta.clone(),
        }];
    }

    text_delta(delta).into_iter().collect()
}

fn text_delta(delta: &Value) -> Option<StreamEvent> {
    match delta.get("content").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Some(StreamEvent::TextDelta {
            text: text.to_string(),
        }),
        _ => None,
    }
}

fn remote_error(error: &Value) -> StreamEvent {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or(UNKNOWN_ERROR)
        .to_string();
    StreamEvent::StreamError {
        cause: StreamFault::Remote { message },
    }
}
