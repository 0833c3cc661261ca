//! Wire types shared by the lexchat server and its clients.
//!
//! ```text
//! Client --[POST {messages}]--> Server --[/api/chat NDJSON]--> LLM runtime
//!        <--[data: {fullContent, done}\n\n]--
//! ```
//!
//! Every stream frame carries the whole visible answer so far, never a delta.
//! A consumer only ever overwrites its pending assistant message.

pub mod documents;
pub mod frames;
pub mod messages;

pub use documents::{ExtractErrorBody, ExtractResponse};
pub use frames::{FRAME_PREFIX, FrameError, StreamFrame, WireFrame};
pub use messages::{AttachedFile, ChatMessage, ChatRequest, Message, Mode, Role};
