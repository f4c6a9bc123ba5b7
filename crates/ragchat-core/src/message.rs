//! Chat message model.
//!
//! Messages are kept in a `Vec` whose insertion order is display order.
//! User messages are created once and never mutated; bot messages are
//! created by the stream assembler and mutated only while streaming.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The local user.
    User,
    /// The remote assistant.
    Bot,
}

/// Unique identifier for a chat message.
///
/// Derived from the creation time in epoch milliseconds plus a
/// process-local sequence number, so IDs are unique and sort roughly by
/// creation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

/// Counter disambiguating IDs minted within the same millisecond.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

impl MessageId {
    /// Mint a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let now_ms = Utc::now().timestamp_millis();
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("msg-{now_ms}-{seq}"))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single entry in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID.
    pub id: MessageId,
    /// Message text. Mutable while a bot message is streaming.
    pub content: String,
    /// Who authored the message.
    pub role: Role,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether chunks are still being appended to this message.
    pub is_streaming: bool,
}

impl ChatMessage {
    /// Create a user message. User messages are complete on creation.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            role: Role::User,
            created_at: Utc::now(),
            is_streaming: false,
        }
    }

    /// Create a bot message that is still receiving chunks.
    #[must_use]
    pub fn bot_streaming(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            role: Role::Bot,
            created_at: Utc::now(),
            is_streaming: true,
        }
    }

    /// Create a bot message that arrived whole.
    #[must_use]
    pub fn bot_complete(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            content: content.into(),
            role: Role::Bot,
            created_at: Utc::now(),
            is_streaming: false,
        }
    }

    /// Check if this is a user message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_unique() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn user_message_is_sealed_on_creation() {
        let msg = ChatMessage::user("hi");
        assert_eq!(msg.role, Role::User);
        assert!(msg.is_user());
        assert!(!msg.is_streaming);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn bot_streaming_message_starts_open() {
        let msg = ChatMessage::bot_streaming("He");
        assert_eq!(msg.role, Role::Bot);
        assert!(!msg.is_user());
        assert!(msg.is_streaming);
    }

    #[test]
    fn bot_complete_message_starts_sealed() {
        let msg = ChatMessage::bot_complete("done");
        assert_eq!(msg.role, Role::Bot);
        assert!(!msg.is_streaming);
    }

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Bot).unwrap(), "\"bot\"");
    }
}
