//! Message and tool-call types exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a stored conversation entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A conversation history entry, as kept by the direct completions variant.
///
/// Assistant entries that record tool traffic carry the raw JSON delta as their
/// content (see [`StoredMessage::tool_payload`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    /// Create a user entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    /// Create an assistant entry.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }

    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// The JSON object behind a tool-call or tool-role entry, if this is one.
    pub fn tool_payload(&self) -> Option<serde_json::Value> {
        if self.sender != Sender::Assistant {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&self.content).ok()?;
        let is_tool_entry = value.get("tool_calls").is_some_and(|calls| !calls.is_null())
            || value.get("role").and_then(|r| r.as_str()) == Some("tool");
        is_tool_entry.then_some(value)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Function name plus JSON-encoded argument string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Output for one tool call, submitted back as `{tool_call_id, output}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub output: String,
    #[serde(skip)]
    pub is_error: bool,
}
