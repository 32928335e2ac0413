//! Interpretation of managed assistant-run stream objects.
//!
//! Objects are classified by their `object` field; the accompanying `event:`
//! line is redundant and never consulted.

use serde_json::Value;
use tracing::debug;

use crate::types::{split_structured, RunStatus, StreamEvent, StreamFault, ToolCall};

pub(crate) fn interpret(value: &Value) -> Option<StreamEvent> {
    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("assistant stream error")
            .to_string();
        return Some(StreamEvent::StreamError {
            cause: StreamFault::Remote { message },
        });
    }

    match value.get("object").and_then(Value::as_str)? {
        "thread.run" => run_event(value),
        "thread.message.delta" => {
            let text = text_parts(value.pointer("/delta/content"));
            (!text.is_empty()).then_some(StreamEvent::TextDelta { text })
        }
        "thread.message" => {
            if value.get("status").and_then(Value::as_str) != Some("completed") {
                return None;
            }
            let (final_text, structured_payload) = split_structured(&text_parts(value.get("content")));
            Some(StreamEvent::MessageDone {
                final_text,
                structured_payload,
            })
        }
        _ => None,
    }
}

fn run_event(value: &Value) -> Option<StreamEvent> {
    let run_id = value.get("id").and_then(Value::as_str)?.to_string();
    let raw_status = value.get("status").and_then(Value::as_str)?;
    let Ok(status) = raw_status.parse::<RunStatus>() else {
        debug!(run_id = %run_id, status = raw_status, "ignoring run with unknown status");
        return None;
    };

    match status {
        RunStatus::RequiresAction => {
            let Some(calls) = value.pointer("/required_action/submit_tool_outputs/tool_calls") else {
                return Some(StreamEvent::RunIdentified { run_id, status });
            };
            match serde_json::from_value::<Vec<ToolCall>>(calls.clone()) {
                Ok(tool_calls) => Some(StreamEvent::RequiresAction { run_id, tool_calls }),
                Err(e) => Some(StreamEvent::StreamError {
                    cause: StreamFault::Malformed {
                        line: calls.to_string(),
                        message: e.to_string(),
                    },
                }),
            }
        }
        RunStatus::Failed | RunStatus::Expired => {
            let message = value
                .pointer("/last_error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("run {run_id} {status}"));
            Some(StreamEvent::StreamError {
                cause: StreamFault::Remote { message },
            })
        }
        _ => Some(StreamEvent::RunIdentified { run_id, status }),
    }
}

fn text_parts(content: Option<&Value>) -> String {
    content
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.pointer("/text/value").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}
