//! Conversation message types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Author of a message. Only user and assistant turns cross the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A `{role, content}` pair as sent to the chat endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/{chat,agent,resume}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// A document whose text was extracted server-side and is waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    /// Opaque client-side identifier.
    pub id: String,
    pub name: String,
    pub text: String,
    pub pages: u32,
}

/// A rendered conversation entry.
///
/// `content` is what the user sees. Attachments are surfaced as metadata,
/// never inlined into the displayed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_attachments: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_files: Option<Vec<AttachedFile>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            has_attachments: false,
            attached_files: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            has_attachments: false,
            attached_files: None,
        }
    }

    /// Attach document metadata. An empty list leaves the message untouched.
    pub fn with_attachments(mut self, files: Vec<AttachedFile>) -> Self {
        if !files.is_empty() {
            self.has_attachments = true;
            self.attached_files = Some(files);
        }
        self
    }
}

/// Assistance mode. Each mode has its own endpoint and its own conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Plain conversation, no system prompt.
    Chat,
    /// Conversational assistant; the server keeps a bounded history window.
    Agent,
    /// Document summarisation; every send starts a fresh conversation.
    Resume,
}

impl Mode {
    /// HTTP path of the streaming endpoint for this mode.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Chat => "/api/chat",
            Self::Agent => "/api/agent",
            Self::Resume => "/api/resume",
        }
    }

    /// Whether previous turns are sent along with a new message.
    pub fn keeps_history(self) -> bool {
        !matches!(self, Self::Resume)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Agent => "agent",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "agent" => Ok(Self::Agent),
            "resume" => Ok(Self::Resume),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
