//! One turn of the managed thread/run variant.

use std::time::Duration;

use strum::Display;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::{CourierError, Result};
use crate::provider::AssistantsBackend;
use crate::stream::{EventReader, EventStream};
use crate::tools::{patch_submission_error, ToolCallDispatcher, ToolExecutor};
use crate::types::{
    ConversationTurnResult, RunStatus, Sender, StreamEvent, StructuredPayload, ToolCall,
    ToolCallResult, DELTA_SENTINEL,
};

/// Live text callback. Receives prose only, never the structured block.
pub type DeltaSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Lifecycle of a [`RunSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    Idle,
    Submitting,
    Streaming,
    AwaitingToolResults,
    Completed,
    Failed,
    Cancelled,
}

/// Limits applied to a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub max_tool_rounds: usize,
    /// `None` disables the idle timeout.
    pub stream_idle_timeout: Option<Duration>,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_tool_rounds: crate::config::DEFAULT_MAX_TOOL_ROUNDS,
            stream_idle_timeout: Some(Duration::from_millis(
                crate::config::DEFAULT_STREAM_IDLE_TIMEOUT_MS,
            )),
        }
    }
}

/// What a single stream round ended with.
enum RoundEnd {
    Finished,
    ToolCalls { run_id: String, calls: Vec<ToolCall> },
}

/// Drives one user message through streaming, tool rounds and completion.
///
/// The session owns the turn's token; the dispatcher only borrows it.
pub struct RunSession<'a> {
    backend: &'a dyn AssistantsBackend,
    executor: &'a dyn ToolExecutor,
    thread_id: &'a str,
    assistant_id: &'a str,
    token: CancellationToken,
    limits: RunLimits,
    state: RunState,
    run_id: Option<String>,
    last_status: Option<RunStatus>,
    remote_cancel_sent: bool,
    responses: Vec<String>,
    round_text: String,
    round_suppressed: bool,
    round_final_text: Option<String>,
    payload: StructuredPayload,
}

impl<'a> RunSession<'a> {
    pub fn new(
        backend: &'a dyn AssistantsBackend,
        executor: &'a dyn ToolExecutor,
        thread_id: &'a str,
        assistant_id: &'a str,
        token: CancellationToken,
    ) -> Self {
        Self {
            backend,
            executor,
            thread_id,
            assistant_id,
            token,
            limits: RunLimits::default(),
            state: RunState::Idle,
            run_id: None,
            last_status: None,
            remote_cancel_sent: false,
            responses: Vec::new(),
            round_text: String::new(),
            round_suppressed: false,
            round_final_text: None,
            payload: StructuredPayload::default(),
        }
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Run the turn for `content`.
    ///
    /// Cancellation is reported through `aborted` on the result, never as an error.
    /// Whenever the turn ends early, a run that may still be going is cancelled remotely.
    pub async fn run(
        &mut self,
        content: &str,
        on_delta: DeltaSink<'_>,
    ) -> Result<ConversationTurnResult> {
        match self.drive(content, on_delta).await {
            Ok(()) => {
                self.transition(RunState::Completed);
                Ok(self.result(false))
            }
            Err(e) if e.is_cancellation() => {
                self.abort_remote().await;
                self.transition(RunState::Cancelled);
                Ok(self.result(true))
            }
            Err(e) => {
                warn!(thread_id = self.thread_id, error = %e, "run failed");
                self.abort_remote().await;
                self.transition(RunState::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&mut self, content: &str, on_delta: DeltaSink<'_>) -> Result<()> {
        self.token.throw_if_cancelled()?;
        self.transition(RunState::Submitting);
        self.submit(content).await?;

        self.token.throw_if_cancelled()?;
        let mut stream = self
            .backend
            .stream_run(self.thread_id, self.assistant_id)
            .await?;
        let mut rounds = 0;

        loop {
            self.transition(RunState::Streaming);
            let end = self.consume(&mut stream, on_delta).await;
            self.finish_round();

            let (run_id, calls) = match end? {
                RoundEnd::Finished => return Ok(()),
                RoundEnd::ToolCalls { run_id, calls } => (run_id, calls),
            };

            rounds += 1;
            if rounds > self.limits.max_tool_rounds {
                return Err(CourierError::TooManyRounds {
                    limit: self.limits.max_tool_rounds,
                });
            }

            self.transition(RunState::AwaitingToolResults);
            debug!(run_id = %run_id, calls = calls.len(), round = rounds, "dispatching tool calls");
            let results = ToolCallDispatcher::new(self.executor)
                .dispatch(&calls, &self.token)
                .await?;

            self.token.throw_if_cancelled()?;
            stream = self.submit_tool_outputs(&run_id, results).await?;
        }
    }

    /// Create the user message, clearing stale active runs once if the thread is busy.
    async fn submit(&mut self, content: &str) -> Result<()> {
        match self
            .backend
            .create_message(self.thread_id, Sender::User, content)
            .await
        {
            Err(e) if e.is_active_run_conflict() => {
                warn!(thread_id = self.thread_id, error = %e, "thread has an active run; cancelling and retrying");
                self.cancel_active_runs().await?;
                self.backend
                    .create_message(self.thread_id, Sender::User, content)
                    .await
            }
            other => other,
        }
    }

    async fn cancel_active_runs(&self) -> Result<()> {
        let runs = self.backend.list_runs(self.thread_id).await?;
        for run in runs.iter().filter(|run| run.status.is_active()) {
            debug!(run_id = %run.id, status = %run.status, "cancelling stale run");
            if let Err(e) = self.backend.cancel_run(self.thread_id, &run.id).await {
                warn!(run_id = %run.id, error = %e, "failed to cancel stale run");
            }
        }
        Ok(())
    }

    /// Submit results; an index-addressed rejection is patched and resubmitted once.
    async fn submit_tool_outputs(
        &self,
        run_id: &str,
        mut results: Vec<ToolCallResult>,
    ) -> Result<EventStream> {
        let err = match self
            .backend
            .submit_tool_outputs_stream(self.thread_id, run_id, &results)
            .await
        {
            Ok(stream) => return Ok(stream),
            Err(e) => e,
        };

        let Some(index) = patch_submission_error(&mut results, &err) else {
            return Err(err);
        };
        warn!(run_id, index, error = %err, "tool output rejected; resubmitting patched outputs");

        self.backend
            .submit_tool_outputs_stream(self.thread_id, run_id, &results)
            .await
            .map_err(|retry| match retry.submission_error_index() {
                Some(index) => CourierError::ToolSubmission {
                    index,
                    message: retry.to_string(),
                },
                None => retry,
            })
    }

    /// Consume one stream until it ends, asks for tool outputs, fails, or the token fires.
    async fn consume(
        &mut self,
        stream: &mut EventStream,
        on_delta: DeltaSink<'_>,
    ) -> Result<RoundEnd> {
        let token = self.token.clone();
        let mut reader = EventReader::new(stream, &token, self.limits.stream_idle_timeout);
        let mut pending_action = None;

        while let Some(event) = reader.next().await? {
            match event {
                StreamEvent::RunIdentified { run_id, status } => self.observe_run(run_id, status),
                StreamEvent::TextDelta { text } => self.on_text(&text, on_delta),
                StreamEvent::MessageDone {
                    final_text,
                    structured_payload,
                } => {
                    self.round_final_text = Some(final_text);
                    self.payload = structured_payload;
                }
                StreamEvent::RequiresAction { run_id, tool_calls } => {
                    self.observe_run(run_id.clone(), RunStatus::RequiresAction);
                    pending_action = Some((run_id, tool_calls));
                }
                StreamEvent::ToolMessage { .. } => {
                    debug!("ignoring tool message on assistant run stream");
                }
                StreamEvent::StreamEnd => break,
                StreamEvent::StreamError { cause } => return Err(cause.into()),
            }
        }

        Ok(match pending_action {
            Some((run_id, calls)) => RoundEnd::ToolCalls { run_id, calls },
            None => RoundEnd::Finished,
        })
    }

    fn observe_run(&mut self, run_id: String, status: RunStatus) {
        if self.run_id.as_deref() != Some(run_id.as_str()) {
            debug!(run_id = %run_id, status = %status, "run identified");
        }
        self.run_id = Some(run_id);
        self.last_status = Some(status);
    }

    /// Echo prose up to the first delta sentinel; everything after it in this round is metadata.
    fn on_text(&mut self, text: &str, on_delta: DeltaSink<'_>) {
        if self.round_suppressed || self.token.is_cancelled() {
            return;
        }

        let text = match text.find(DELTA_SENTINEL) {
            Some(boundary) => {
                self.round_suppressed = true;
                &text[..boundary]
            }
            None => text,
        };
        if text.is_empty() {
            return;
        }
        on_delta(text);
        self.round_text.push_str(text);
    }

    fn finish_round(&mut self) {
        let streamed = std::mem::take(&mut self.round_text);
        let final_text = self.round_final_text.take();
        self.round_suppressed = false;

        let text = if streamed.is_empty() {
            final_text.unwrap_or_default()
        } else {
            streamed
        };
        if !text.is_empty() {
            self.responses.push(text);
        }
    }

    /// Best-effort remote cancel: at most once, and only for a run that may still be going.
    async fn abort_remote(&mut self) {
        if self.remote_cancel_sent {
            return;
        }
        let Some(run_id) = self.run_id.clone() else {
            debug!("no run identified; stopping locally");
            return;
        };
        if self.last_status.is_some_and(|status| status.is_terminal()) {
            return;
        }

        self.remote_cancel_sent = true;
        debug!(run_id = %run_id, "cancelling remote run");
        if let Err(e) = self.backend.cancel_run(self.thread_id, &run_id).await {
            warn!(run_id = %run_id, error = %e, "failed to cancel run");
        }
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, thread_id = self.thread_id, "run state");
            self.state = next;
        }
    }

    fn result(&mut self, aborted: bool) -> ConversationTurnResult {
        ConversationTurnResult {
            response: self.responses.join("\n"),
            payload: std::mem::take(&mut self.payload),
            run_id: self.run_id.clone(),
            thread_id: Some(self.thread_id.to_string()),
            assistant_id: Some(self.assistant_id.to_string()),
            messages: Vec::new(),
            aborted,
        }
    }
}
