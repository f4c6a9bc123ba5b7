//! Stream reassembly state machine.
//!
//! Folds the sequence of inbound frames for one response cycle into the
//! message list: chunk frames accumulate into a single bot message, the
//! done flag seals it, and a whole-message fallback frame appends one
//! already-sealed message.
//!
//! The two pieces of cross-frame state — the pointer to the accumulating
//! message and the processed flag — live here as struct fields, so the
//! transitions are testable without a socket or UI attached.

use crate::frame::InboundFrame;
use crate::message::{ChatMessage, MessageId};

/// Outcome of applying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The frame was dropped (late duplicate after a finished response).
    Ignored,
    /// The message list changed; the response is still in flight.
    Updated,
    /// The response cycle finished; callers clear their loading state.
    Completed,
}

/// Accumulates streamed chunks into bot messages.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    /// Message currently receiving chunks, if any.
    current: Option<MessageId>,
    /// Whether the current response cycle has already produced a
    /// finished message. Guards against duplicate late frames.
    processed: bool,
}

impl StreamAssembler {
    /// Create an assembler with no response in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a fresh response cycle. Called when a request is sent,
    /// so the next chunk starts a new bot message.
    pub fn begin_response(&mut self) {
        self.current = None;
        self.processed = false;
    }

    /// Whether a bot message is currently accumulating chunks.
    #[must_use]
    pub fn is_accumulating(&self) -> bool {
        self.current.is_some()
    }

    /// Apply one decoded frame to the message list.
    pub fn apply(&mut self, frame: InboundFrame, messages: &mut Vec<ChatMessage>) -> Applied {
        // A finished response with nothing accumulating means any
        // further frame is a late duplicate.
        if self.processed && self.current.is_none() {
            return Applied::Ignored;
        }

        match frame {
            InboundFrame::Chunk { chunk, done } => self.apply_chunk(&chunk, done, messages),
            InboundFrame::Complete { message } => self.apply_complete(message, messages),
        }
    }

    fn apply_chunk(&mut self, chunk: &str, done: bool, messages: &mut Vec<ChatMessage>) -> Applied {
        match &self.current {
            None => {
                let msg = ChatMessage::bot_streaming(chunk);
                self.current = Some(msg.id.clone());
                self.processed = false;
                messages.push(msg);
            }
            Some(id) => {
                if let Some(msg) = messages.iter_mut().find(|m| &m.id == id) {
                    msg.content.push_str(chunk);
                    msg.is_streaming = !done;
                }
            }
        }

        if done {
            self.finish(messages);
            Applied::Completed
        } else {
            Applied::Updated
        }
    }

    fn apply_complete(&mut self, message: String, messages: &mut Vec<ChatMessage>) -> Applied {
        if self.processed {
            return Applied::Ignored;
        }
        messages.push(ChatMessage::bot_complete(message));
        self.finish(messages);
        Applied::Completed
    }

    /// Seal the accumulating message (idempotent even when the last
    /// chunk update already cleared the flag), mark the cycle processed,
    /// and drop the pointer.
    fn finish(&mut self, messages: &mut [ChatMessage]) {
        if let Some(id) = self.current.take() {
            if let Some(msg) = messages.iter_mut().find(|m| m.id == id) {
                msg.is_streaming = false;
            }
        }
        self.processed = true;
        self.sweep(messages);
    }

    /// Timeout path: seal any in-flight message and end the cycle.
    ///
    /// Also marks the cycle processed, so a stray chunk arriving between
    /// the forced seal and the next send is discarded rather than
    /// starting an orphan bot message.
    pub fn force_seal(&mut self, messages: &mut [ChatMessage]) {
        self.finish(messages);
    }

    /// Defensive re-sweep: with nothing accumulating, no message may be
    /// left open.
    pub fn sweep(&mut self, messages: &mut [ChatMessage]) {
        if self.current.is_none() {
            for msg in messages.iter_mut() {
                msg.is_streaming = false;
            }
        }
    }
}
