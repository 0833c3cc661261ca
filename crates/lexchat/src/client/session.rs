//! Send state machine for one chat window.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use lexchat_protocol::{
    AttachedFile, ChatMessage, ChatRequest, FrameError, Message, Mode, StreamFrame,
};

use super::ChatTransport;
use super::compose::compose;
use super::decoder::FrameDecoder;
use super::store::ConversationStore;

/// Shown instead of sending when the server is known to be down.
pub const UNAVAILABLE_MESSAGE: &str = "L'API n'est pas disponible";

/// Shown when the chat request itself failed.
pub const TRANSPORT_ERROR_MESSAGE: &str = "Désolé, une erreur s'est produite.";

/// Lifecycle of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Streaming,
    Complete,
    Failed,
}

/// Notifications for the render layer, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    MessageAppended { mode: Mode, message: Message },
    /// The content of the last message was overwritten.
    LastMessageUpdated { mode: Mode, content: String },
}

/// A chat window: pending attachments, per-mode history and the send loop.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    store: ConversationStore,
    mode: Mode,
    attachments: Vec<AttachedFile>,
    health: Option<watch::Receiver<Option<bool>>>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    state: SessionState,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            store: ConversationStore::new(),
            mode: Mode::Chat,
            attachments: Vec::new(),
            health: None,
            events: None,
            state: SessionState::Idle,
        }
    }

    /// Gate sends on a health monitor's published status.
    pub fn with_health(mut self, health: watch::Receiver<Option<bool>>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.state = SessionState::Idle;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Conversation of the current mode.
    pub fn messages(&self) -> &[Message] {
        self.store.messages(self.mode)
    }

    pub fn attach(&mut self, file: AttachedFile) {
        self.attachments.push(file);
    }

    pub fn attachments(&self) -> &[AttachedFile] {
        &self.attachments
    }

    pub fn remove_attachment(&mut self, id: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|file| file.id != id);
        self.attachments.len() != before
    }

    pub fn clear_conversation(&mut self) {
        self.store.reset(self.mode);
        self.state = SessionState::Idle;
    }

    fn health_status(&self) -> Option<bool> {
        self.health.as_ref().and_then(|rx| *rx.borrow())
    }

    /// Send `input` with the pending attachments and consume the answer.
    ///
    /// Blank input without attachments is ignored. Returns the final state.
    pub async fn send(&mut self, input: &str) -> SessionState {
        if input.trim().is_empty() && self.attachments.is_empty() {
            return self.state;
        }

        let mode = self.mode;
        // Pending attachments and history stay untouched when nothing is sent.
        if self.health_status() == Some(false) {
            warn!(%mode, "Server unavailable, message not sent");
            self.append(Message::assistant(UNAVAILABLE_MESSAGE));
            return self.transition(SessionState::Failed);
        }

        let files = std::mem::take(&mut self.attachments);
        let composed = compose(input, &files);

        if !mode.keeps_history() {
            self.store.reset(mode);
        }
        let mut history = self.store.outbound_history(mode);
        history.push(ChatMessage::user(composed.outbound));
        self.append(Message::user(composed.display).with_attachments(files));
        self.transition(SessionState::Sending);

        let request = ChatRequest { messages: history };
        let mut body = match self.transport.stream_chat(mode, &request).await {
            Ok(body) => body,
            Err(e) => {
                warn!(%mode, "Chat request failed: {}", e);
                self.append(Message::assistant(TRANSPORT_ERROR_MESSAGE));
                return self.transition(SessionState::Failed);
            }
        };

        self.append(Message::assistant(""));
        self.transition(SessionState::Streaming);

        let mut decoder = FrameDecoder::new();
        // Set once an error frame arrived; the body is still drained.
        let mut stopped = false;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    let frames = decoder.push(&bytes);
                    if !stopped {
                        stopped = self.apply_frames(frames);
                    }
                }
                Err(e) => {
                    warn!(%mode, "Chat stream interrupted: {}", e);
                    if !stopped {
                        self.update_last(TRANSPORT_ERROR_MESSAGE);
                        stopped = true;
                    }
                    break;
                }
            }
        }
        if !stopped {
            stopped = self.apply_frames(decoder.finish());
        }
        drop(body);

        if stopped {
            self.transition(SessionState::Failed)
        } else {
            info!(%mode, "Answer complete");
            self.transition(SessionState::Complete)
        }
    }

    /// Apply frames in order. Returns `true` once an error frame was applied.
    fn apply_frames(&mut self, frames: Vec<Result<StreamFrame, FrameError>>) -> bool {
        for frame in frames {
            match frame {
                Ok(StreamFrame::Error { message }) => {
                    self.update_last(message);
                    return true;
                }
                Ok(frame) => self.update_last(frame.text()),
                Err(e) => warn!("Skipping malformed frame: {}", e),
            }
        }
        false
    }

    fn append(&mut self, message: Message) {
        self.store.append(self.mode, message.clone());
        self.emit(SessionEvent::MessageAppended {
            mode: self.mode,
            message,
        });
    }

    fn update_last(&mut self, content: impl Into<String>) {
        let content = content.into();
        if self.store.replace_last_content(self.mode, content.clone()) {
            self.emit(SessionEvent::LastMessageUpdated {
                mode: self.mode,
                content,
            });
        }
    }

    fn transition(&mut self, state: SessionState) -> SessionState {
        debug!(from = ?self.state, to = ?state, "Session state");
        self.state = state;
        self.emit(SessionEvent::StateChanged(state));
        state
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // Render layer gone; the session keeps working without it.
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ByteStream, ClientError, ClientResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use lexchat_protocol::Role;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed body and records every request.
    #[derive(Default)]
    struct Scripted {
        chunks: Vec<ClientResult<Bytes>>,
        fail_request: bool,
        calls: AtomicUsize,
        requests: Mutex<Vec<(Mode, ChatRequest)>>,
    }

    impl Scripted {
        fn body(parts: &[&str]) -> Self {
            Self {
                chunks: parts
                    .iter()
                    .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ChatTransport for Scripted {
        async fn health_check(&self) -> bool {
            true
        }

        async fn stream_chat(&self, mode: Mode, request: &ChatRequest) -> ClientResult<ByteStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push((mode, request.clone()));
            if self.fail_request {
                return Err(ClientError::Status {
                    status: 500,
                    body: String::new(),
                });
            }
            let chunks: Vec<ClientResult<Bytes>> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(b) => Ok(b.clone()),
                    Err(_) => Err(ClientError::InvalidResponse("reset".to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    fn session(transport: &Arc<Scripted>) -> ChatSession {
        ChatSession::new(transport.clone())
    }

    #[tokio::test]
    async fn test_full_content_overwrites() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"Bon\",\"done\":false}\n\n",
            "data: {\"fullContent\":\"Bonjour !\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);

        assert_eq!(chat.send("Bonjour").await, SessionState::Complete);
        let messages = chat.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("Bonjour"));
        assert_eq!(messages[1], Message::assistant("Bonjour !"));
    }

    #[tokio::test]
    async fn test_error_frame_stops_processing() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"Bon\",\"done\":false}\n\n",
            "data: {\"fullContent\":\"Oups\",\"done\":true,\"error\":true}\n\n",
            "data: {\"fullContent\":\"ignored\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);

        assert_eq!(chat.send("Bonjour").await, SessionState::Failed);
        assert_eq!(chat.messages()[1].content, "Oups");
    }

    #[tokio::test]
    async fn test_unavailable_server_skips_request() {
        let transport = Arc::new(Scripted::body(&[]));
        let (_tx, rx) = watch::channel(Some(false));
        let mut chat = session(&transport).with_health(rx);

        assert_eq!(chat.send("Bonjour").await, SessionState::Failed);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(chat.messages(), &[Message::assistant(UNAVAILABLE_MESSAGE)]);
    }

    #[tokio::test]
    async fn test_unavailable_server_keeps_attachments_and_history() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"Résumé\",\"done\":true}\n\n",
        ]));
        let (health_tx, health_rx) = watch::channel(None);
        let mut chat = session(&transport).with_health(health_rx);
        chat.set_mode(Mode::Resume);
        chat.send("premier").await;
        assert_eq!(chat.messages().len(), 2);

        health_tx.send(Some(false)).unwrap();
        chat.attach(AttachedFile {
            id: "f1".to_string(),
            name: "contrat.pdf".to_string(),
            text: "ARTICLE 1...".to_string(),
            pages: 3,
        });

        assert_eq!(chat.send("Résume ceci").await, SessionState::Failed);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chat.attachments().len(), 1);
        assert_eq!(chat.attachments()[0].id, "f1");
        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], Message::user("premier"));
        assert_eq!(messages[1], Message::assistant("Résumé"));
        assert_eq!(messages[2], Message::assistant(UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn test_input_is_sent_verbatim() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"ok\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);

        assert_eq!(chat.send("  Article 1240 :\n").await, SessionState::Complete);
        assert_eq!(chat.messages()[0].content, "  Article 1240 :\n");
        let requests = transport.requests.lock().unwrap();
        let sent = requests[0].1.messages.last().unwrap();
        assert_eq!(sent.content, "  Article 1240 :\n");
    }

    #[tokio::test]
    async fn test_unknown_health_still_sends() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"ok\",\"done\":true}\n\n",
        ]));
        let (_tx, rx) = watch::channel(None);
        let mut chat = session(&transport).with_health(rx);

        assert_eq!(chat.send("Bonjour").await, SessionState::Complete);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_appends_apology() {
        let transport = Arc::new(Scripted {
            fail_request: true,
            ..Scripted::default()
        });
        let mut chat = session(&transport);

        assert_eq!(chat.send("Bonjour").await, SessionState::Failed);
        assert_eq!(chat.messages()[1], Message::assistant(TRANSPORT_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_interrupted_body_replaces_placeholder() {
        let transport = Arc::new(Scripted {
            chunks: vec![
                Ok(Bytes::from_static(b"data: {\"fullContent\":\"Bon\",\"done\":false}\n\n")),
                Err(ClientError::InvalidResponse("reset".to_string())),
            ],
            ..Scripted::default()
        });
        let mut chat = session(&transport);

        assert_eq!(chat.send("Bonjour").await, SessionState::Failed);
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[1].content, TRANSPORT_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let transport = Arc::new(Scripted::body(&[
            "data: {broken\n\n",
            "data: {\"fullContent\":\"Bonjour\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);

        assert_eq!(chat.send("Salut").await, SessionState::Complete);
        assert_eq!(chat.messages()[1].content, "Bonjour");
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let transport = Arc::new(Scripted::body(&[]));
        let mut chat = session(&transport);

        assert_eq!(chat.send("   ").await, SessionState::Idle);
        assert!(chat.messages().is_empty());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attachments_are_consumed_once() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"Résumé\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);
        chat.set_mode(Mode::Resume);
        chat.attach(AttachedFile {
            id: "f1".to_string(),
            name: "contrat.pdf".to_string(),
            text: "ARTICLE 1...".to_string(),
            pages: 3,
        });

        chat.send("Résume ceci").await;
        assert!(chat.attachments().is_empty());

        let requests = transport.requests.lock().unwrap();
        let (mode, request) = &requests[0];
        assert_eq!(*mode, Mode::Resume);
        assert_eq!(
            request.messages[0].content,
            "Résume ceci\n\n--- Contenu du document \"contrat.pdf\" (3 pages) ---\nARTICLE 1...\n--- Fin du document ---"
        );
        let shown = &chat.messages()[0];
        assert_eq!(shown.content, "Résume ceci");
        assert!(shown.has_attachments);
    }

    #[tokio::test]
    async fn test_resume_mode_resets_history() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"ok\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);
        chat.set_mode(Mode::Resume);
        chat.send("premier").await;
        chat.send("second").await;

        assert_eq!(chat.messages().len(), 2);
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[1].1.messages.len(), 1);
        assert_eq!(requests[1].1.messages[0].content, "second");
    }

    #[tokio::test]
    async fn test_chat_mode_sends_full_history() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"ok\",\"done\":true}\n\n",
        ]));
        let mut chat = session(&transport);
        chat.send("premier").await;
        chat.send("second").await;

        let requests = transport.requests.lock().unwrap();
        let roles: Vec<Role> = requests[1].1.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    }

    #[tokio::test]
    async fn test_events_follow_state_machine() {
        let transport = Arc::new(Scripted::body(&[
            "data: {\"fullContent\":\"Bon\",\"done\":false}\n\n",
            "data: {\"fullContent\":\"Bonjour !\",\"done\":true}\n\n",
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut chat = session(&transport).with_events(tx);
        chat.send("Bonjour").await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let states: Vec<SessionState> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                SessionState::Sending,
                SessionState::Streaming,
                SessionState::Complete
            ]
        );
        assert!(events.contains(&SessionEvent::LastMessageUpdated {
            mode: Mode::Chat,
            content: "Bonjour !".to_string(),
        }));
    }
}
