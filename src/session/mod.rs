//! Session context
//!
//! Explicit per-conversation state handed to each handler. History itself
//! is persisted in the `messages` table keyed by the session id.

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionContext {
    /// History key; a fresh uuid for local chats, the sender id for
    /// webhook-originated conversations.
    pub id: String,
    /// Chat-platform sender id, when the turn came in over the webhook.
    pub sender: Option<String>,
    /// Display name of the sender, if the platform provided one.
    pub display_name: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: None,
            display_name: None,
        }
    }

    /// Context for a chat-platform sender; the sender id doubles as the
    /// history key so each contact keeps one continuous conversation.
    pub fn for_sender(sender: impl Into<String>, display_name: Option<String>) -> Self {
        let sender = sender.into();
        Self {
            id: sender.clone(),
            sender: Some(sender),
            display_name,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
