//! Stream frames exchanged over `text/event-stream`.
//!
//! On the wire a frame is one line `data: <json>` followed by a blank line.
//! The JSON shape is [`WireFrame`]; consumers work with the tagged
//! [`StreamFrame`] produced by [`StreamFrame::decode`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Line prefix of a data-carrying frame.
pub const FRAME_PREFIX: &str = "data:";

/// JSON payload of a frame, exactly as serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,
    /// Older producers put error text here instead of `fullContent`.
    #[serde(default, skip_serializing)]
    pub content: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

/// A validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Intermediate update carrying the whole visible text so far.
    Content { full_content: String },
    /// Final update; nothing follows.
    Done { full_content: String },
    /// Terminal failure with a user-facing message.
    Error { message: String },
}

/// Why a frame payload was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame payload: {0}")]
    InvalidJson(String),

    #[error("frame carries no content")]
    MissingContent,
}

impl StreamFrame {
    pub fn content(full_content: impl Into<String>) -> Self {
        Self::Content {
            full_content: full_content.into(),
        }
    }

    pub fn done(full_content: impl Into<String>) -> Self {
        Self::Done {
            full_content: full_content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Text the consumer should display after applying this frame.
    pub fn text(&self) -> &str {
        match self {
            Self::Content { full_content } | Self::Done { full_content } => full_content,
            Self::Error { message } => message,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }

    /// Decode the JSON payload of a `data:` line.
    ///
    /// `error: true` takes precedence over `done`.
    pub fn decode(payload: &str) -> Result<Self, FrameError> {
        let wire: WireFrame = serde_json::from_str(payload.trim())
            .map_err(|e| FrameError::InvalidJson(e.to_string()))?;
        Self::try_from(wire)
    }

    pub fn to_wire(&self) -> WireFrame {
        match self {
            Self::Content { full_content } => WireFrame {
                full_content: Some(full_content.clone()),
                content: None,
                done: false,
                error: None,
            },
            Self::Done { full_content } => WireFrame {
                full_content: Some(full_content.clone()),
                content: None,
                done: true,
                error: None,
            },
            Self::Error { message } => WireFrame {
                full_content: Some(message.clone()),
                content: None,
                done: true,
                error: Some(true),
            },
        }
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and bools always serialises.
        serde_json::to_string(&self.to_wire()).unwrap_or_default()
    }

    /// Full `data: <json>\n\n` block.
    pub fn encode(&self) -> String {
        format!("{FRAME_PREFIX} {}\n\n", self.to_json())
    }

    /// Parse one complete line of an event stream.
    ///
    /// Returns `None` for lines that carry no data (blank separators,
    /// comments, other fields).
    pub fn parse_line(line: &str) -> Option<Result<Self, FrameError>> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let payload = line.strip_prefix(FRAME_PREFIX)?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        Some(Self::decode(payload))
    }
}

impl TryFrom<WireFrame> for StreamFrame {
    type Error = FrameError;

    fn try_from(wire: WireFrame) -> Result<Self, FrameError> {
        let text = wire
            .full_content
            .or(wire.content)
            .ok_or(FrameError::MissingContent)?;
        if wire.error.unwrap_or(false) {
            Ok(StreamFrame::Error { message: text })
        } else if wire.done {
            Ok(StreamFrame::Done { full_content: text })
        } else {
            Ok(StreamFrame::Content { full_content: text })
        }
    }
}
