//! Trailing structured-data block appended to assistant prose.
//!
//! The assistant is instructed to end each answer with a JSON block surrounded by
//! [`BLOCK_SENTINEL`]. While streaming, the first [`DELTA_SENTINEL`] marks where the
//! prose stops.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Character marking the start of trailing metadata inside a text delta.
pub const DELTA_SENTINEL: char = '⁙';

/// Delimiter around the JSON block in the assembled message text.
pub const BLOCK_SENTINEL: &str = "⁙⁙⁙";

/// A file referenced by the assistant's answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileReference {
    pub name: String,
    pub path: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Parsed trailing metadata. Unknown keys are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredPayload {
    #[serde(default)]
    pub files: Vec<FileReference>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Split assembled message text into prose and structured payload.
///
/// A malformed block is logged and replaced by the default payload; the prose is
/// returned either way.
pub fn split_structured(text: &str) -> (String, StructuredPayload) {
    let mut segments = text.split(BLOCK_SENTINEL);
    let prose = segments.next().unwrap_or_default().trim_end().to_string();

    let payload = match segments.next().map(str::trim) {
        Some(block) if !block.is_empty() => match serde_json::from_str(block) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to parse structured block from message");
                debug!(text, "unparsed message text");
                StructuredPayload::default()
            }
        },
        _ => StructuredPayload::default(),
    };

    (prose, payload)
}
