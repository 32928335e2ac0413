//! Executes a batch of requested tool calls.
//!
//! Every call yields exactly one [`ToolCallResult`], in input order. Execution
//! failures become failure text in the output; only cancellation aborts a batch.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::executor::ToolExecutor;
use crate::cancel::CancellationToken;
use crate::error::{CourierError, Result};
use crate::types::{ToolCall, ToolCallResult};

/// Aggregate call that bundles several calls in one argument payload.
pub const PARALLEL_TOOL_NAME: &str = "multi_tool_use.parallel";

const FUNCTION_NAMESPACE: &str = "functions.";

#[derive(Debug, Deserialize)]
struct ParallelArguments {
    #[serde(default)]
    tool_uses: Vec<ToolUse>,
}

#[derive(Debug, Deserialize)]
struct ToolUse {
    recipient_name: String,
    #[serde(default)]
    parameters: serde_json::Value,
}

struct Outcome {
    output: String,
    is_error: bool,
}

/// Runs tool calls through a caller-supplied [`ToolExecutor`].
pub struct ToolCallDispatcher<'a> {
    executor: &'a dyn ToolExecutor,
}

impl<'a> ToolCallDispatcher<'a> {
    pub fn new(executor: &'a dyn ToolExecutor) -> Self {
        Self { executor }
    }

    /// Execute `calls` in order.
    ///
    /// Returns `Err(CourierError::Cancelled)` as soon as the token is observed
    /// cancelled before a (sub)call; nothing further executes.
    pub async fn dispatch(
        &self,
        calls: &[ToolCall],
        token: &CancellationToken,
    ) -> Result<Vec<ToolCallResult>> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            token.throw_if_cancelled()?;

            let outcome = if call.name() == PARALLEL_TOOL_NAME {
                self.run_parallel(call, token).await?
            } else {
                self.run_one(call.name(), parse_arguments(&call.function.arguments))
                    .await
            };

            results.push(ToolCallResult {
                tool_call_id: call.id.clone(),
                output: outcome.output,
                is_error: outcome.is_error,
            });
        }

        Ok(results)
    }

    async fn run_parallel(&self, call: &ToolCall, token: &CancellationToken) -> Result<Outcome> {
        let uses = match serde_json::from_str::<ParallelArguments>(&call.function.arguments) {
            Ok(parsed) if !parsed.tool_uses.is_empty() => parsed.tool_uses,
            Ok(_) => return Ok(failure("no tool uses in parallel call")),
            Err(e) => return Ok(failure(&format!("invalid arguments: {e}"))),
        };

        let mut outputs = Vec::with_capacity(uses.len());
        let mut failures = 0;
        for tool_use in uses {
            token.throw_if_cancelled()?;
            let name = tool_use
                .recipient_name
                .strip_prefix(FUNCTION_NAMESPACE)
                .unwrap_or(&tool_use.recipient_name);
            let args = match tool_use.parameters {
                serde_json::Value::Null => serde_json::json!({}),
                params => params,
            };
            let outcome = self.run_one(name, Ok(args)).await;
            if outcome.is_error {
                failures += 1;
            }
            outputs.push(outcome.output);
        }

        Ok(Outcome {
            is_error: failures == outputs.len(),
            output: outputs.join("\n"),
        })
    }

    async fn run_one(&self, name: &str, args: Result<serde_json::Value>) -> Outcome {
        let args = match args {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = name, error = %e, "tool arguments are not valid JSON");
                return failure(&format!("invalid arguments: {e}"));
            }
        };

        debug!(tool = name, "executing tool call");
        match self.executor.execute(name, args).await {
            Ok(value) => success(&value),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                failure(&failure_message(&e))
            }
        }
    }
}

/// Parse a JSON-encoded argument string; blank means no arguments.
fn parse_arguments(raw: &str) -> Result<serde_json::Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(serde_json::json!({}));
    }
    Ok(serde_json::from_str(trimmed)?)
}

fn success(value: &serde_json::Value) -> Outcome {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    Outcome {
        output: format!("\n```json\n{pretty}\n```\n"),
        is_error: false,
    }
}

fn failure(message: &str) -> Outcome {
    Outcome {
        output: format!("Tool call failed: {message}"),
        is_error: true,
    }
}

fn failure_message(error: &CourierError) -> String {
    match error {
        CourierError::ToolExecution { message, .. } => message.clone(),
        CourierError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Extract `k` from a `tool_outputs[k]` validation message.
pub(crate) fn tool_output_index(message: &str) -> Option<usize> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"tool_outputs\[(\d+)\]").expect("static pattern is valid"));
    pattern
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|index| index.as_str().parse().ok())
}

/// Rewrite the result addressed by an index-addressed submission error.
///
/// Returns the patched index, or `None` when the error is not such a rejection or
/// the index is out of range.
pub fn patch_submission_error(results: &mut [ToolCallResult], error: &CourierError) -> Option<usize> {
    let index = error.submission_error_index()?;
    let result = results.get_mut(index)?;
    result.output = format!("Error submitting tool outputs: {}", failure_message(error));
    result.is_error = true;
    Some(index)
}
