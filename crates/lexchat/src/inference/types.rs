//! Runtime API types.

use serde::{Deserialize, Serialize};

use lexchat_protocol::{ChatMessage, Role};

/// Role as understood by the runtime, which also accepts system prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeRole {
    System,
    User,
    Assistant,
}

/// A message as sent to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMessage {
    pub role: RuntimeRole,
    pub content: String,
}

impl RuntimeMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: RuntimeRole::System,
            content: content.into(),
        }
    }
}

impl From<ChatMessage> for RuntimeMessage {
    fn from(msg: ChatMessage) -> Self {
        let role = match msg.role {
            Role::User => RuntimeRole::User,
            Role::Assistant => RuntimeRole::Assistant,
        };
        Self {
            role,
            content: msg.content,
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatStreamRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [RuntimeMessage],
    pub stream: bool,
}

/// One piece of a streamed completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenChunk {
    /// Newly generated text; may be empty on the final chunk.
    pub content: String,
    /// Whether the runtime considers the completion finished.
    pub done: bool,
}

impl TokenChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn last(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: true,
        }
    }
}

/// One line of the runtime's streaming chat response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatStreamLine {
    #[serde(default)]
    pub message: Option<ChatStreamMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatStreamMessage {
    #[serde(default)]
    pub content: String,
}
