//! Server side of the chat stream: runtime tokens in, frames out.
//!
//! Every frame carries the whole filtered answer so far. Frames are only
//! emitted when the visible text grew or the runtime signalled completion,
//! so tokens that fall inside a `<think>` span produce no traffic.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use lexchat_protocol::StreamFrame;

use crate::inference::{ChatBackend, RuntimeMessage, TokenChunk};
use crate::think::ThinkFilter;

/// User-facing text of the single error frame.
pub const APOLOGY: &str = "Désolé, une erreur s'est produite lors de la communication avec l'IA.";

/// Accumulates raw runtime output and decides which frames to emit.
#[derive(Debug, Default)]
pub struct FrameProducer {
    raw: String,
    filter: ThinkFilter,
    emitted_len: usize,
    finished: bool,
}

impl FrameProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unfiltered runtime output received so far.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Feed one runtime chunk. Returns the frame to send, if any.
    pub fn on_chunk(&mut self, chunk: &TokenChunk) -> Option<StreamFrame> {
        if self.finished {
            return None;
        }
        self.raw.push_str(&chunk.content);
        self.filter.push(&chunk.content);

        if chunk.done {
            return self.finish();
        }

        let visible = self.filter.visible();
        if visible.len() > self.emitted_len {
            self.emitted_len = visible.len();
            Some(StreamFrame::content(visible))
        } else {
            None
        }
    }

    /// Close the answer. Returns the final frame unless already closed.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        if self.finished {
            return None;
        }
        self.finished = true;
        let visible = self.filter.finish().to_string();
        self.emitted_len = visible.len();
        Some(StreamFrame::done(visible))
    }
}

/// Run one completion and push its frames into `tx`.
///
/// Returns after the final frame, after the single error frame, or as soon
/// as the receiver is gone; the runtime stream is dropped in every case.
pub async fn stream_completion(
    backend: Arc<dyn ChatBackend>,
    model: String,
    messages: Vec<RuntimeMessage>,
    tx: mpsc::Sender<StreamFrame>,
) {
    let mut tokens = match backend.chat_stream(&model, messages).await {
        Ok(tokens) => tokens,
        Err(e) => {
            error!(model = %model, "Runtime chat call failed: {}", e);
            let _ = tx.send(StreamFrame::error(APOLOGY)).await;
            return;
        }
    };

    let mut producer = FrameProducer::new();
    while let Some(item) = tokens.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(model = %model, "Runtime stream failed: {}", e);
                let _ = tx.send(StreamFrame::error(APOLOGY)).await;
                return;
            }
        };

        if let Some(frame) = producer.on_chunk(&chunk) {
            let terminal = frame.is_terminal();
            if tx.send(frame).await.is_err() {
                debug!("Client disconnected, dropping runtime stream");
                return;
            }
            if terminal {
                break;
            }
        }
    }

    if let Some(frame) = producer.finish() {
        // Runtime closed the stream without a done chunk.
        let _ = tx.send(frame).await;
    }
    info!(
        model = %model,
        raw_len = producer.raw().len(),
        "Chat stream complete"
    );
}
