//! Streaming legal assistant.
//!
//! The server relays a local LLM runtime to browsers over server-sent
//! events, hiding `<think>` reasoning spans, and extracts text from
//! uploaded PDFs. The client consumes that stream and keeps per-mode
//! conversations.

pub mod api;
pub mod client;
pub mod config;
pub mod inference;
pub mod pdf;
pub mod prompts;
pub mod stream;
pub mod think;
