//! Decoded stream events.

use serde::{Deserialize, Serialize};

use super::message::ToolCall;
use super::payload::StructuredPayload;
use super::run::RunStatus;

/// One protocol unit derived from a complete `data:` line.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    TextDelta { text: String },
    /// The assistant message is complete; prose and trailing block already split.
    MessageDone {
        final_text: String,
        structured_payload: StructuredPayload,
    },
    /// The run is waiting for tool outputs.
    RequiresAction {
        run_id: String,
        tool_calls: Vec<ToolCall>,
    },
    /// A run object was observed.
    RunIdentified { run_id: String, status: RunStatus },
    /// Direct variant: an assistant delta carrying `tool_calls` or a tool-role message.
    ToolMessage { message: serde_json::Value },
    StreamEnd,
    StreamError { cause: StreamFault },
}

impl StreamEvent {
    /// Whether decoding stops after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnd | Self::StreamError { .. })
    }
}

/// Why a stream failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamFault {
    /// A `data:` line was not valid JSON.
    Malformed { line: String, message: String },
    /// The backend reported an error inside the stream.
    Remote { message: String },
}

impl std::fmt::Display for StreamFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { line, message } => write!(f, "malformed line {line:?}: {message}"),
            Self::Remote { message } => f.write_str(message),
        }
    }
}
