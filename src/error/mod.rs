//! Error types for Courier.

use thiserror::Error;

use crate::types::StreamFault;

/// Primary error type for all Courier operations.
#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A `data:` line that is not valid JSON. Fatal for the turn.
    #[error("Protocol error: {message} (line: {line})")]
    Protocol { message: String, line: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Tool output submission rejected at index {index}: {message}")]
    ToolSubmission { index: usize, message: String },

    #[error("Tool loop exceeded {limit} rounds")]
    TooManyRounds { limit: usize },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Cooperative cancellation signal. Turn APIs report it through
    /// `ConversationTurnResult::aborted` instead of returning it.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl CourierError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the backend rejected a request because the thread already has an active run.
    pub fn is_active_run_conflict(&self) -> bool {
        match self {
            Self::Api { message, .. } => message.contains("is active"),
            _ => false,
        }
    }

    /// Index of the rejected entry for `tool_outputs[k]` validation errors.
    pub fn submission_error_index(&self) -> Option<usize> {
        match self {
            Self::Api { status: 400, message } => crate::tools::dispatcher::tool_output_index(message),
            Self::ToolSubmission { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error is potentially retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<StreamFault> for CourierError {
    fn from(fault: StreamFault) -> Self {
        match fault {
            StreamFault::Malformed { line, message } => Self::Protocol { message, line },
            StreamFault::Remote { message } => Self::Stream(message),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CourierError>;
