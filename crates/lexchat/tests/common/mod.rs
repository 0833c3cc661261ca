//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;

use lexchat::api::{AppState, create_router};
use lexchat::config::AppConfig;
use lexchat::inference::{
    ChatBackend, InferenceError, InferenceResult, RuntimeMessage, TokenChunk, TokenStream,
};
use lexchat::pdf::{ExtractError, ExtractResult, ExtractedText, Strategy, TextExtractor};

/// Runtime that replays a fixed completion and records its inputs.
#[derive(Default)]
pub struct ScriptedBackend {
    chunks: Vec<TokenChunk>,
    fail: bool,
    pub loads: AtomicUsize,
    pub requests: Mutex<Vec<Vec<RuntimeMessage>>>,
}

impl ScriptedBackend {
    pub fn replying(chunks: Vec<TokenChunk>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    /// Every chat call fails before producing output.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn chat_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat_stream(
        &self,
        _model: &str,
        messages: Vec<RuntimeMessage>,
    ) -> InferenceResult<TokenStream> {
        self.requests.lock().unwrap().push(messages);
        if self.fail {
            return Err(InferenceError::ConnectionFailed {
                url: "http://localhost:11434/api/chat".to_string(),
                message: "connection refused".to_string(),
            });
        }
        let items: Vec<InferenceResult<TokenChunk>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn health(&self) -> InferenceResult<bool> {
        Ok(!self.fail)
    }

    async fn load_model(&self, _model: &str) -> InferenceResult<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Extractor returning a canned document, or failing every strategy.
pub struct StubExtractor {
    pub text: Option<String>,
    pub pages: u32,
}

impl StubExtractor {
    pub fn document(text: &str, pages: u32) -> Self {
        Self {
            text: Some(text.to_string()),
            pages,
        }
    }

    pub fn broken() -> Self {
        Self {
            text: None,
            pages: 0,
        }
    }
}

impl TextExtractor for StubExtractor {
    fn extract(&self, _data: &[u8], strategy: Strategy) -> ExtractResult<ExtractedText> {
        match &self.text {
            Some(text) => Ok(ExtractedText {
                text: text.clone(),
                pages: self.pages,
            }),
            None => Err(ExtractError::Parse(format!("{strategy:?}: invalid xref table"))),
        }
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.inference.model = "test-model".to_string();
    config
}

/// Router around the given collaborators.
pub fn test_app_with(
    config: AppConfig,
    backend: Arc<ScriptedBackend>,
    extractor: StubExtractor,
) -> Router {
    create_router(AppState::new(config, backend, Arc::new(extractor)))
}

pub fn test_app(backend: Arc<ScriptedBackend>) -> Router {
    test_app_with(
        test_config(),
        backend,
        StubExtractor::document("ARTICLE 1...", 3),
    )
}

/// Serve `app` on an ephemeral loopback port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
