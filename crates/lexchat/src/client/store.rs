//! Per-mode conversation history.

use std::collections::HashMap;

use lexchat_protocol::{ChatMessage, Message, Mode, Role};

use super::compose::outbound_content;

/// Conversations keyed by assistance mode.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    conversations: HashMap<Mode, Vec<Message>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, mode: Mode) -> &[Message] {
        self.conversations
            .get(&mode)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn append(&mut self, mode: Mode, message: Message) {
        self.conversations.entry(mode).or_default().push(message);
    }

    /// Overwrite the content of the last message.
    ///
    /// Returns `false` when the conversation is empty or ends with a user
    /// message.
    pub fn replace_last_content(&mut self, mode: Mode, content: impl Into<String>) -> bool {
        match self
            .conversations
            .get_mut(&mode)
            .and_then(|messages| messages.last_mut())
        {
            Some(last) if last.role == Role::Assistant => {
                last.content = content.into();
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self, mode: Mode) {
        self.conversations.remove(&mode);
    }

    /// History as sent to the server, documents inlined into user turns.
    pub fn outbound_history(&self, mode: Mode) -> Vec<ChatMessage> {
        self.messages(mode)
            .iter()
            .map(|message| {
                let files = message.attached_files.as_deref().unwrap_or_default();
                ChatMessage {
                    role: message.role,
                    content: outbound_content(&message.content, files),
                }
            })
            .collect()
    }
}
