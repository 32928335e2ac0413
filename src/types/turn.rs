//! Outcome of one conversation turn.

use serde::{Deserialize, Serialize};

use super::message::StoredMessage;
use super::payload::StructuredPayload;

/// Externally visible result of a turn, for either client variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurnResult {
    /// Accumulated assistant prose.
    pub response: String,
    /// Trailing structured data (referenced files, ...).
    pub payload: StructuredPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    /// Tool traffic reified as separate entries (direct variant).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<StoredMessage>,
    /// The turn was cancelled; `response` holds whatever arrived before that.
    #[serde(default)]
    pub aborted: bool,
}
