//! Publish/subscribe channel for conversation events.
//!
//! Consumers (a UI, a logger, a test) subscribe to a [`ChatBus`]; clients publish
//! to the handle they were constructed with.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::StoredMessage;

const DEFAULT_CAPACITY: usize = 256;

/// An event about one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A complete message was added to the conversation.
    Message {
        conversation_id: String,
        message: StoredMessage,
    },
    /// Live response text. Cumulative: each event replaces the previous one.
    Typing {
        conversation_id: String,
        is_typing: bool,
        text_so_far: String,
    },
    Error {
        conversation_id: String,
        message: String,
    },
}

impl ChatEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::Message {
                conversation_id, ..
            }
            | Self::Typing {
                conversation_id, ..
            }
            | Self::Error {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

/// Cloneable handle over a broadcast channel.
#[derive(Debug, Clone)]
pub struct ChatBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl Default for ChatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Slow subscribers lag (and skip events) once `capacity` events are buffered.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Without subscribers the event is dropped.
    pub fn publish(&self, event: ChatEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(conversation_id = event.conversation_id(), "no chat bus subscribers");
        }
    }

    pub fn message(&self, conversation_id: &str, message: StoredMessage) {
        self.publish(ChatEvent::Message {
            conversation_id: conversation_id.to_string(),
            message,
        });
    }

    pub fn typing(&self, conversation_id: &str, is_typing: bool, text_so_far: &str) {
        self.publish(ChatEvent::Typing {
            conversation_id: conversation_id.to_string(),
            is_typing,
            text_so_far: text_so_far.to_string(),
        });
    }

    pub fn error(&self, conversation_id: &str, message: impl Into<String>) {
        self.publish(ChatEvent::Error {
            conversation_id: conversation_id.to_string(),
            message: message.into(),
        });
    }
}
