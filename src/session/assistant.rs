//! Thread and assistant lifecycle around [`RunSession`] turns.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::run::{DeltaSink, RunLimits, RunSession};
use crate::cancel::CancellationToken;
use crate::config::CourierConfig;
use crate::error::{CourierError, Result};
use crate::instructions::{base_instructions, build_instructions, AgentInfo};
use crate::provider::{AssistantsBackend, CreateAssistantRequest};
use crate::tools::ToolExecutor;
use crate::types::{ConversationTurnResult, Sender};

/// One conversation on a backend thread.
///
/// At most one turn is in flight at a time; its token is kept so that
/// [`cancel_current_run`](Self::cancel_current_run) can reach it from another task.
pub struct AssistantSession {
    backend: Arc<dyn AssistantsBackend>,
    config: CourierConfig,
    assistant_id: Option<String>,
    thread_id: Option<String>,
    tools: Vec<serde_json::Value>,
    instructions: String,
    current: Mutex<Option<CancellationToken>>,
}

impl AssistantSession {
    pub fn new(backend: Arc<dyn AssistantsBackend>, config: CourierConfig) -> Self {
        Self {
            backend,
            config,
            assistant_id: None,
            thread_id: None,
            tools: Vec::new(),
            instructions: base_instructions(),
            current: Mutex::new(None),
        }
    }

    /// Reuse an existing assistant instead of creating one at [`init`](Self::init).
    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = Some(id.into());
        self
    }

    /// Continue an existing thread.
    pub fn with_thread_id(mut self, id: impl Into<String>) -> Self {
        self.thread_id = Some(id.into());
        self
    }

    /// Function tool schemas, typically from [`ToolRegistry::schemas`](crate::tools::ToolRegistry::schemas).
    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_instructions(mut self, agents: &[AgentInfo], extra: Option<&str>) -> Self {
        self.instructions = build_instructions(agents, extra);
        self
    }

    pub fn assistant_id(&self) -> Option<&str> {
        self.assistant_id.as_deref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Create the assistant and the thread when their ids are absent.
    pub async fn init(&mut self) -> Result<()> {
        if self.assistant_id.is_none() {
            let request = CreateAssistantRequest {
                name: self.config.assistant_name().to_string(),
                model: self.config.model().to_string(),
                instructions: self.instructions.clone(),
                tools: self.tools.clone(),
            };
            let id = self.backend.create_assistant(&request).await?;
            info!(assistant_id = %id, model = %request.model, "assistant created");
            self.assistant_id = Some(id);
        }

        if self.thread_id.is_none() {
            let id = self.backend.create_thread().await?;
            info!(thread_id = %id, "thread created");
            self.thread_id = Some(id);
        }
        Ok(())
    }

    /// Send a user message and run the turn to completion, cancellation or failure.
    pub async fn add_user_message(
        &self,
        content: &str,
        executor: &dyn ToolExecutor,
        on_delta: DeltaSink<'_>,
    ) -> Result<ConversationTurnResult> {
        let (thread_id, assistant_id) = self.ids()?;
        let (token, _turn) = self.begin_turn()?;

        let mut run = RunSession::new(
            self.backend.as_ref(),
            executor,
            thread_id,
            assistant_id,
            token,
        )
        .with_limits(RunLimits {
            max_tool_rounds: self.config.max_tool_rounds(),
            stream_idle_timeout: self.config.stream_idle_timeout(),
        });

        run.run(content, on_delta).await
    }

    /// Cancel the turn in flight. Returns `false` when there is none.
    pub fn cancel_current_run(&self) -> bool {
        let current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        match current {
            Some(token) => {
                token.cancel();
                true
            }
            None => {
                info!("no ongoing run to cancel");
                false
            }
        }
    }

    /// Append an assistant-authored message without running the assistant.
    pub async fn add_assistant_message(&self, content: &str) -> Result<()> {
        let (thread_id, _) = self.ids()?;
        self.backend
            .create_message(thread_id, Sender::Assistant, content)
            .await
    }

    /// Raw message objects of the thread.
    pub async fn messages(&self) -> Result<Vec<serde_json::Value>> {
        let (thread_id, _) = self.ids()?;
        self.backend.list_messages(thread_id).await
    }

    /// Delete the thread, then the assistant.
    pub async fn destroy(mut self) -> Result<()> {
        if let Some(thread_id) = self.thread_id.take() {
            self.backend.delete_thread(&thread_id).await?;
            debug!(thread_id = %thread_id, "thread deleted");
        }
        if let Some(assistant_id) = self.assistant_id.take() {
            self.backend.delete_assistant(&assistant_id).await?;
            debug!(assistant_id = %assistant_id, "assistant deleted");
        }
        Ok(())
    }

    fn ids(&self) -> Result<(&str, &str)> {
        match (self.thread_id.as_deref(), self.assistant_id.as_deref()) {
            (Some(thread), Some(assistant)) => Ok((thread, assistant)),
            _ => Err(CourierError::InvalidState(
                "session is not initialized; call init() first".to_string(),
            )),
        }
    }

    fn begin_turn(&self) -> Result<(CancellationToken, TurnGuard<'_>)> {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if current.is_some() {
            return Err(CourierError::InvalidState(
                "a turn is already in flight for this conversation".to_string(),
            ));
        }

        let token = CancellationToken::new();
        let thread_id = self.thread_id.clone().unwrap_or_default();
        token.on_cancel(move || warn!(thread_id = %thread_id, "turn cancelled by caller"));
        *current = Some(token.clone());
        Ok((token, TurnGuard(&self.current)))
    }
}

/// Clears the current token when the turn ends, including when its future is dropped.
struct TurnGuard<'a>(&'a Mutex<Option<CancellationToken>>);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

impl std::fmt::Debug for AssistantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantSession")
            .field("assistant_id", &self.assistant_id)
            .field("thread_id", &self.thread_id)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}
