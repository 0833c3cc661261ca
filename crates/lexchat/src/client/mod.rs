//! Chat client: stream consumption, attachments, conversation state.
//!
//! ```text
//! ChatSession::send
//!   ├─ compose()            input + attachments -> outbound / display
//!   ├─ ConversationStore    per-mode history, replace-last updates
//!   ├─ ChatTransport        POST /api/<mode>, body as byte stream
//!   └─ FrameDecoder         bytes -> StreamFrame
//! ```

mod compose;
mod decoder;
mod error;
mod health;
mod http;
mod session;
mod store;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use lexchat_protocol::{ChatRequest, Mode};

pub use compose::{Composed, compose, outbound_content};
pub use decoder::FrameDecoder;
pub use error::{ClientError, ClientResult};
pub use health::HealthMonitor;
pub use http::ApiClient;
pub use session::{
    ChatSession, SessionEvent, SessionState, TRANSPORT_ERROR_MESSAGE, UNAVAILABLE_MESSAGE,
};
pub use store::ConversationStore;

/// Raw response body of a chat request.
pub type ByteStream = Pin<Box<dyn Stream<Item = ClientResult<Bytes>> + Send>>;

/// Minimal server API used by the session, for testability.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn health_check(&self) -> bool;

    async fn stream_chat(&self, mode: Mode, request: &ChatRequest) -> ClientResult<ByteStream>;
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn health_check(&self) -> bool {
        ApiClient::health_check(self).await
    }

    async fn stream_chat(&self, mode: Mode, request: &ChatRequest) -> ClientResult<ByteStream> {
        ApiClient::stream_chat(self, mode, request).await
    }
}
