//! Chat screen state and its transitions.
//!
//! `ChatState` owns the conversation, the input buffer and the two busy
//! flags. The network side is split in two halves: `begin_*` decides whether a
//! request should go out and marks the action busy, `finish_*` applies the
//! result. The TUI runs the request in between on a spawned task; `submit` and
//! `reprocess` chain all three for callers that can simply await.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;

pub const SEND_ERROR_TEXT: &str = "Sorry, I encountered an error. Please try again.";
pub const REPROCESS_SUCCESS_TEXT: &str =
    "Documents have been reprocessed successfully! You can now ask questions about the new content.";
pub const REPROCESS_ERROR_TEXT: &str =
    "Sorry, there was an error reprocessing the documents. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: usize,
    pub text: String,
    pub sender: Sender,
}

/// What a completed (or refused) send did to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was blank or a send was already in flight; nothing happened.
    Skipped,
    /// User message and assistant reply were appended.
    Replied,
    /// The fixed error reply was appended; input kept for retry.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprocessOutcome {
    Skipped,
    Succeeded,
    Failed,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[derive(Debug, Default)]
pub struct ChatState {
    messages: Vec<Message>,
    input: String,
    cursor: usize,
    is_loading: bool,
    is_reprocessing: bool,
    // Text of the send currently in flight
    pending: Option<String>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Cursor position in characters, not bytes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_reprocessing(&self) -> bool {
        self.is_reprocessing
    }

    /// Whether the send action is currently enabled.
    pub fn can_send(&self) -> bool {
        !self.is_loading && !self.input.trim().is_empty()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.cursor = self.input.chars().count();
    }

    fn push(&mut self, sender: Sender, text: String) {
        let id = self.messages.len() + 1;
        self.messages.push(Message { id, text, sender });
    }

    /// Mark a send as in flight and hand back the raw text to send.
    ///
    /// Returns `None` when the trimmed input is empty or a send is already
    /// running; no request should be made in that case.
    pub fn begin_send(&mut self) -> Option<String> {
        if !self.can_send() {
            return None;
        }
        self.is_loading = true;
        self.pending = Some(self.input.clone());
        self.pending.clone()
    }

    pub fn finish_send(&mut self, reply: Result<String>) -> SendOutcome {
        let Some(text) = self.pending.take() else {
            return SendOutcome::Skipped;
        };
        self.is_loading = false;

        match reply {
            Ok(response) => {
                self.push(Sender::User, text);
                self.push(Sender::Ai, response);
                self.input.clear();
                self.cursor = 0;
                SendOutcome::Replied
            }
            Err(e) => {
                tracing::error!("Error sending message: {:#}", e);
                self.push(Sender::Ai, SEND_ERROR_TEXT.to_string());
                SendOutcome::Failed
            }
        }
    }

    pub fn begin_reprocess(&mut self) -> bool {
        if self.is_reprocessing {
            return false;
        }
        self.is_reprocessing = true;
        true
    }

    pub fn finish_reprocess(&mut self, result: Result<()>) -> ReprocessOutcome {
        if !self.is_reprocessing {
            return ReprocessOutcome::Skipped;
        }
        self.is_reprocessing = false;

        match result {
            Ok(()) => {
                self.push(Sender::Ai, REPROCESS_SUCCESS_TEXT.to_string());
                ReprocessOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!("Error reprocessing documents: {:#}", e);
                self.push(Sender::Ai, REPROCESS_ERROR_TEXT.to_string());
                ReprocessOutcome::Failed
            }
        }
    }

    /// Run a whole send against `backend`, awaiting the reply in place.
    pub async fn submit(&mut self, backend: &dyn Backend) -> SendOutcome {
        let Some(text) = self.begin_send() else {
            return SendOutcome::Skipped;
        };
        let reply = backend.chat(&text).await;
        self.finish_send(reply)
    }

    pub async fn reprocess(&mut self, backend: &dyn Backend) -> ReprocessOutcome {
        if !self.begin_reprocess() {
            return ReprocessOutcome::Skipped;
        }
        let result = backend.reprocess().await;
        self.finish_reprocess(result)
    }

    // Input editing. The field is disabled while a send is in flight.

    pub fn insert_char(&mut self, c: char) {
        if self.is_loading {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_loading || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.is_loading {
            return;
        }
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}
