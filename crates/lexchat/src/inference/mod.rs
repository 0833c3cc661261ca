//! Local LLM runtime client.
//!
//! Talks to an Ollama-compatible runtime: streaming `/api/chat` (one JSON
//! object per line), `/api/tags` for liveness and an empty chat request to
//! preload a model.

mod client;
mod error;
mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

pub use client::{OllamaClient, decode_ndjson};
pub use error::{InferenceError, InferenceResult};
pub use types::*;

/// Ordered token chunks of one chat completion.
pub type TokenStream = Pin<Box<dyn Stream<Item = InferenceResult<TokenChunk>> + Send>>;

/// Minimal runtime abstraction for testability.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a streaming completion over `messages`.
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<RuntimeMessage>,
    ) -> InferenceResult<TokenStream>;

    /// Whether the runtime answers at all.
    async fn health(&self) -> InferenceResult<bool>;

    /// Ask the runtime to load `model` into memory.
    async fn load_model(&self, model: &str) -> InferenceResult<()>;
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<RuntimeMessage>,
    ) -> InferenceResult<TokenStream> {
        OllamaClient::chat_stream(self, model, messages).await
    }

    async fn health(&self) -> InferenceResult<bool> {
        OllamaClient::health_check(self).await
    }

    async fn load_model(&self, model: &str) -> InferenceResult<()> {
        OllamaClient::load_model(self, model).await
    }
}
