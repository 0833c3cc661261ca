//! Application state shared by all handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AppConfig;
use crate::inference::ChatBackend;
use crate::pdf::TextExtractor;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// LLM runtime.
    pub backend: Arc<dyn ChatBackend>,
    /// PDF text extractor.
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Arc<AppConfig>,
    /// Set once the model has been warmed up.
    model_loaded: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn ChatBackend>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            backend,
            extractor,
            config: Arc::new(config),
            model_loaded: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.inference.model
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_model_loaded(&self) {
        self.model_loaded.store(true, Ordering::Release);
    }
}
