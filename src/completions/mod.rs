//! Direct chat-completions streaming client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::bus::ChatBus;
use crate::cancel::CancellationToken;
use crate::config::CourierConfig;
use crate::error::{CourierError, Result};
use crate::provider::http::{bearer_headers, build_client, check_status};
use crate::stream::{decode_byte_stream, EventReader, StreamDecoder};
use crate::types::{
    split_structured, ConversationTurnResult, Sender, StoredMessage, StreamEvent, DELTA_SENTINEL,
};

/// Request options for the completions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Leave earlier tool-call and tool-result entries out of the request.
    #[serde(default)]
    pub omit_tool_messages: bool,
}

/// Streams one assistant reply per call and publishes progress on a [`ChatBus`].
#[derive(Debug, Clone)]
pub struct CompletionStreamClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    options: CompletionOptions,
    idle_timeout: Option<Duration>,
    bus: ChatBus,
}

impl CompletionStreamClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, bus: ChatBus) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: None,
            options: CompletionOptions::default(),
            idle_timeout: None,
            bus,
        }
    }

    /// Endpoint, key, model and idle timeout from configuration. The key is optional.
    pub fn from_config(config: &CourierConfig, bus: ChatBus) -> Result<Self> {
        let mut client = Self::new(build_client(config)?, config.completions_url(), bus)
            .with_options(CompletionOptions {
                model: Some(config.model().to_string()),
                ..CompletionOptions::default()
            });
        client.idle_timeout = config.stream_idle_timeout();
        client.api_key = config.api_key().map(str::to_string);
        Ok(client)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn bus(&self) -> &ChatBus {
        &self.bus
    }

    /// Request body for `history`.
    pub fn request_body(&self, history: &[StoredMessage]) -> Value {
        let mut body = json!({
            "messages": build_messages(history, !self.options.omit_tool_messages),
            "stream": true,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(model) = &self.options.model {
                obj.insert("model".into(), json!(model));
            }
            if let Some(max_tokens) = self.options.max_tokens {
                obj.insert("max_tokens".into(), json!(max_tokens));
            }
            if let Some(temperature) = self.options.temperature {
                obj.insert("temperature".into(), json!(temperature));
            }
        }
        body
    }

    /// Stream the reply to `history`.
    ///
    /// Failures are published as [`ChatEvent::Error`](crate::bus::ChatEvent::Error)
    /// before being returned. A cancelled token yields `aborted = true`.
    pub async fn send(
        &self,
        conversation_id: &str,
        history: &[StoredMessage],
        token: &CancellationToken,
    ) -> Result<ConversationTurnResult> {
        let result = self.stream_reply(conversation_id, history, token).await;
        if let Err(e) = &result {
            warn!(conversation_id, error = %e, "completion stream failed");
            self.bus.typing(conversation_id, false, "");
            self.bus.error(conversation_id, e.to_string());
        }
        result
    }

    async fn stream_reply(
        &self,
        conversation_id: &str,
        history: &[StoredMessage],
        token: &CancellationToken,
    ) -> Result<ConversationTurnResult> {
        let mut response = String::new();
        let mut messages = Vec::new();

        let outcome = self
            .consume(conversation_id, history, token, &mut response, &mut messages)
            .await;
        let aborted = match outcome {
            Ok(()) => false,
            Err(e) if e.is_cancellation() => true,
            Err(e) => return Err(e),
        };

        let (prose, payload) = split_structured(&response);
        if aborted {
            debug!(conversation_id, "completion stream cancelled");
        } else {
            self.bus
                .message(conversation_id, StoredMessage::assistant(prose.clone()));
        }
        self.bus.typing(conversation_id, false, "");

        Ok(ConversationTurnResult {
            response: prose,
            payload,
            messages,
            aborted,
            ..ConversationTurnResult::default()
        })
    }

    async fn consume(
        &self,
        conversation_id: &str,
        history: &[StoredMessage],
        token: &CancellationToken,
        response: &mut String,
        messages: &mut Vec<StoredMessage>,
    ) -> Result<()> {
        token.throw_if_cancelled()?;

        let mut headers = match &self.api_key {
            Some(key) => bearer_headers(key),
            None => reqwest::header::HeaderMap::new(),
        };
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        debug!(conversation_id, url = %self.url, history = history.len(), "opening completion stream");
        let resp = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(&self.request_body(history))
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let mut stream = decode_byte_stream(resp.bytes_stream(), StreamDecoder::chat_completions());
        let mut reader = EventReader::new(&mut stream, token, self.idle_timeout);

        while let Some(event) = reader.next().await? {
            match event {
                StreamEvent::TextDelta { text } => {
                    response.push_str(&text);
                    let visible = response.split(DELTA_SENTINEL).next().unwrap_or_default();
                    self.bus.typing(conversation_id, true, visible);
                }
                StreamEvent::ToolMessage { message } => {
                    let entry = StoredMessage::assistant(message.to_string());
                    self.bus.message(conversation_id, entry.clone());
                    messages.push(entry);
                }
                StreamEvent::StreamEnd => break,
                StreamEvent::StreamError { cause } => return Err(CourierError::from(cause)),
                other => debug!(event = ?other, "ignoring event on completion stream"),
            }
        }
        Ok(())
    }
}

/// Map stored history to completion messages.
///
/// Tool-call and tool-role entries are replayed as their JSON objects when
/// `include_tool_messages` is set; otherwise they are dropped.
pub fn build_messages(history: &[StoredMessage], include_tool_messages: bool) -> Vec<Value> {
    history
        .iter()
        .filter_map(|entry| match entry.sender {
            Sender::User => Some(json!({ "role": "user", "content": entry.content })),
            Sender::Assistant => match entry.tool_payload() {
                Some(_) if !include_tool_messages => None,
                Some(mut payload) => {
                    if payload.get("tool_calls").is_some_and(|calls| !calls.is_null()) {
                        payload["role"] = json!("assistant");
                    }
                    Some(payload)
                }
                None => Some(json!({ "role": "assistant", "content": entry.content })),
            },
        })
        .collect()
}
