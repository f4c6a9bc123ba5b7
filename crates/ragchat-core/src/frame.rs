//! Wire codec for the chat socket.
//!
//! Outbound: one JSON text frame per request, carrying the new user text
//! plus the prior conversation re-expressed with the two-value wire role
//! vocabulary (`user`/`assistant`).
//!
//! Inbound: frames decode to [`InboundFrame`]. Two shapes are recognized,
//! in priority order: an incremental `{"chunk": ..., "done": ...}` frame,
//! and a whole-message `{"message": ...}` fallback. Anything else is a
//! decode error; callers log and drop such frames without touching
//! connection state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::{ChatMessage, Role};

/// Errors produced by the codec.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was not valid JSON or matched no recognized shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Role vocabulary used on the wire.
///
/// The backend only understands two roles; the internal [`Role::Bot`]
/// maps to `assistant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireRole {
    /// A prior user turn.
    User,
    /// A prior assistant turn.
    Assistant,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Bot => Self::Assistant,
        }
    }
}

/// One prior conversation turn, as transmitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Wire role of the turn.
    pub role: WireRole,
    /// Turn text.
    pub content: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.into(),
            content: msg.content.clone(),
        }
    }
}

/// Client -> server: a chat request.
///
/// `history` holds the turns before the one being sent; the new text
/// travels in `message`, not in `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// The new user text.
    pub message: String,
    /// Prior turns, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl OutboundRequest {
    /// Build a request from the new text and the prior message list.
    #[must_use]
    pub fn new(message: impl Into<String>, prior: &[ChatMessage]) -> Self {
        Self {
            message: message.into(),
            history: prior.iter().map(HistoryEntry::from).collect(),
        }
    }
}

/// Server -> client: one decoded frame.
///
/// Variant order is decode priority: the chunk shape wins when a frame
/// could match both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    /// An incremental fragment of a streamed response.
    Chunk {
        /// Text to append (may be empty on the final frame).
        chunk: String,
        /// Whether this is the last fragment of the response.
        #[serde(default)]
        done: bool,
    },
    /// A complete response delivered in one frame. Fallback format.
    Complete {
        /// The whole response text.
        message: String,
    },
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns [`FrameError::Malformed`] for invalid JSON or any shape other
/// than the two recognized ones.
pub fn decode_frame(raw: &str) -> Result<InboundFrame, FrameError> {
    Ok(serde_json::from_str(raw)?)
}

/// Encode one outbound request as a text frame.
///
/// # Errors
///
/// Returns [`FrameError::Malformed`] if serialization fails (it cannot
/// for these types, but the boundary stays fallible).
pub fn encode_request(request: &OutboundRequest) -> Result<String, FrameError> {
    Ok(serde_json::to_string(request)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chunk_frame() {
        let frame = decode_frame(r#"{"chunk":"Hel","done":false}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Chunk {
                chunk: "Hel".to_string(),
                done: false,
            }
        );
    }

    #[test]
    fn decodes_final_chunk_with_empty_text() {
        // The backend closes streams with an empty chunk carrying done=true.
        let frame = decode_frame(r#"{"chunk":"","done":true}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Chunk {
                chunk: String::new(),
                done: true,
            }
        );
    }

    #[test]
    fn done_defaults_to_false() {
        let frame = decode_frame(r#"{"chunk":"x"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Chunk {
                chunk: "x".to_string(),
                done: false,
            }
        );
    }

    #[test]
    fn decodes_whole_message_fallback() {
        let frame = decode_frame(r#"{"message":"complete answer"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Complete {
                message: "complete answer".to_string(),
            }
        );
    }

    #[test]
    fn chunk_shape_wins_over_fallback() {
        let frame = decode_frame(r#"{"chunk":"a","done":true,"message":"b"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Chunk { .. }));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn rejects_unrecognized_shape() {
        assert!(decode_frame(r#"{"error":"boom","code":"stream_error"}"#).is_err());
        assert!(decode_frame("42").is_err());
        assert!(decode_frame(r#"{"done":true}"#).is_err());
    }

    #[test]
    fn encodes_request_with_history() {
        let prior = vec![ChatMessage::user("hi"), ChatMessage::bot_complete("hello")];
        let request = OutboundRequest::new("how are you?", &prior);

        let json = encode_request(&request).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["message"], "how are you?");
        assert_eq!(parsed["history"][0]["role"], "user");
        assert_eq!(parsed["history"][0]["content"], "hi");
        assert_eq!(parsed["history"][1]["role"], "assistant");
        assert_eq!(parsed["history"][1]["content"], "hello");
    }

    #[test]
    fn encodes_empty_history() {
        let request = OutboundRequest::new("hi", &[]);
        let json = encode_request(&request).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["message"], "hi");
        assert_eq!(parsed["history"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn bot_role_maps_to_assistant_on_the_wire() {
        assert_eq!(WireRole::from(Role::Bot), WireRole::Assistant);
        assert_eq!(WireRole::from(Role::User), WireRole::User);
    }
}
