//! Convenience re-exports for common use.

pub use crate::bus::{ChatBus, ChatEvent};
pub use crate::cancel::CancellationToken;
pub use crate::completions::{CompletionOptions, CompletionStreamClient};
pub use crate::config::CourierConfig;
pub use crate::error::{CourierError, Result};
pub use crate::instructions::AgentInfo;
pub use crate::provider::{AssistantsBackend, OpenAiAssistantsBackend};
pub use crate::session::{AssistantSession, RunSession, RunState};
pub use crate::tools::{AgentTask, FnExecutor, ToolExecutor, ToolRegistry};
pub use crate::types::{
    ConversationTurnResult, StoredMessage, StreamEvent, StructuredPayload, ToolCall,
    ToolCallResult,
};
