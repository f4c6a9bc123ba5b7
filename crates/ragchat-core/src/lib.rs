//! Core chat types and streaming logic for ragchat.
//!
//! This crate provides the pieces of the chat pipeline that carry protocol
//! state but no I/O:
//!
//! - **Messages**: the chat message model and identifier type
//! - **Frames**: the wire codec for outbound requests and inbound frames
//! - **Stream assembly**: the state machine that folds chunk frames into
//!   complete bot messages
//!
//! # Example
//!
//! ```
//! use ragchat_core::{decode_frame, ChatMessage, StreamAssembler};
//!
//! let mut messages: Vec<ChatMessage> = Vec::new();
//! let mut assembler = StreamAssembler::new();
//! assembler.begin_response();
//!
//! for raw in [r#"{"chunk":"He","done":false}"#, r#"{"chunk":"llo","done":true}"#] {
//!     let frame = decode_frame(raw).unwrap();
//!     assembler.apply(frame, &mut messages);
//! }
//!
//! assert_eq!(messages[0].content, "Hello");
//! assert!(!messages[0].is_streaming);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod frame;
pub mod message;
pub mod stream;

pub use frame::{decode_frame, encode_request, FrameError, HistoryEntry, InboundFrame, OutboundRequest, WireRole};
pub use message::{ChatMessage, MessageId, Role};
pub use stream::{Applied, StreamAssembler};
