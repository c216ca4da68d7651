//! Append-only conversation transcript with a KV cache cursor.
//!
//! `cursor` marks how many bytes of the transcript have been evaluated by the
//! engine. Everything past it is the unseen suffix that the next turn must
//! submit. A user turn is staged as a [`PendingTurn`] and only becomes part of
//! the transcript when the turn commits, so a failed turn never leaves a
//! partial mutation behind.

use std::borrow::Cow;

use crate::error::TurnError;

/// Opens a user turn.
pub const USER_TURN_OPEN: &str = "<|im_start|>user\n";
/// Closes the user turn and opens the assistant reply.
pub const ASSISTANT_TURN_OPEN: &str = "<|im_end|><|im_start|>assistant\n\n";
/// Closes the assistant reply. Appended after the cursor is advanced.
pub const TURN_CLOSE: &str = "<|im_end|>";

/// Conversation text and the evaluated prefix length.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    text: String,
    cursor: usize,
}

/// A rendered user turn that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    rendered: String,
}

impl PendingTurn {
    /// Render `user_text` with the chat turn markers.
    pub fn new(user_text: &str) -> Self {
        let mut rendered =
            String::with_capacity(USER_TURN_OPEN.len() + user_text.len() + ASSISTANT_TURN_OPEN.len());
        rendered.push_str(USER_TURN_OPEN);
        rendered.push_str(user_text);
        rendered.push_str(ASSISTANT_TURN_OPEN);
        Self { rendered }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

/// Text the engine has not seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<'a> {
    /// `transcript[cursor..]`.
    pub unseen: &'a str,
    /// The staged user turn.
    pub pending: &'a str,
    /// Whether begin-of-sequence tokens should be added. Only the very first
    /// prefill of a session gets them.
    pub add_special: bool,
}

impl<'a> Delta<'a> {
    /// The delta as one contiguous string.
    pub fn text(&self) -> Cow<'a, str> {
        match (self.unseen.is_empty(), self.pending.is_empty()) {
            (_, true) => Cow::Borrowed(self.unseen),
            (true, false) => Cow::Borrowed(self.pending),
            (false, false) => Cow::Owned(format!("{}{}", self.unseen, self.pending)),
        }
    }

    pub fn len(&self) -> usize {
        self.unseen.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transcript {
    /// Create an empty transcript with the cursor at 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offset of the first byte the engine has not evaluated.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes never applied to the engine cache.
    pub fn unseen(&self) -> Result<&str, TurnError> {
        self.text.get(self.cursor..).ok_or(TurnError::InvalidCursor {
            cursor: self.cursor,
            len: self.text.len(),
        })
    }

    /// Unseen suffix followed by the staged turn.
    pub fn compute_delta<'a>(&'a self, pending: &'a PendingTurn) -> Result<Delta<'a>, TurnError> {
        let unseen = self.unseen()?;
        Ok(Delta {
            unseen,
            pending: pending.as_str(),
            add_special: self.cursor == 0,
        })
    }

    /// Commit a successful turn.
    ///
    /// The cursor stops right after the assistant text: the closing delimiter
    /// is left unseen so it is tokenized with the next user turn.
    pub fn commit(&mut self, pending: PendingTurn, assistant: &str) {
        self.text.push_str(&pending.rendered);
        self.text.push_str(assistant);
        self.cursor = self.text.len();
        self.text.push_str(TURN_CLOSE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transcript_is_empty() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.cursor(), 0);
        assert_eq!(transcript.unseen().unwrap(), "");
    }

    #[test]
    fn test_pending_turn_rendering() {
        let pending = PendingTurn::new("hello");
        assert_eq!(
            pending.as_str(),
            "<|im_start|>user\nhello<|im_end|><|im_start|>assistant\n\n"
        );
    }

    #[test]
    fn test_first_delta_adds_special() {
        let transcript = Transcript::new();
        let pending = PendingTurn::new("hi");
        let delta = transcript.compute_delta(&pending).unwrap();
        assert!(delta.add_special);
        assert_eq!(delta.unseen, "");
        assert_eq!(delta.text(), pending.as_str());
    }

    #[test]
    fn test_commit_leaves_close_delimiter_unseen() {
        let mut transcript = Transcript::new();
        let pending = PendingTurn::new("hi");
        let expected_cursor = pending.as_str().len() + "Hello!".len();
        transcript.commit(pending, "Hello!");

        assert_eq!(transcript.cursor(), expected_cursor);
        assert_eq!(transcript.unseen().unwrap(), TURN_CLOSE);
        assert!(transcript.cursor() <= transcript.len());
    }

    #[test]
    fn test_second_delta_carries_close_delimiter() {
        let mut transcript = Transcript::new();
        transcript.commit(PendingTurn::new("one"), "first");

        let pending = PendingTurn::new("two");
        let delta = transcript.compute_delta(&pending).unwrap();
        assert!(!delta.add_special);
        assert_eq!(
            delta.text(),
            "<|im_end|><|im_start|>user\ntwo<|im_end|><|im_start|>assistant\n\n"
        );
        assert_eq!(delta.len(), delta.text().len());
    }

    #[test]
    fn test_cursor_past_end_is_rejected() {
        let transcript = Transcript {
            text: "abc".to_string(),
            cursor: 4,
        };
        assert_eq!(
            transcript.unseen(),
            Err(TurnError::InvalidCursor { cursor: 4, len: 3 })
        );
    }

    #[test]
    fn test_cursor_inside_char_is_rejected() {
        let transcript = Transcript {
            text: "é".to_string(),
            cursor: 1,
        };
        assert!(matches!(
            transcript.compute_delta(&PendingTurn::new("x")),
            Err(TurnError::InvalidCursor { cursor: 1, len: 2 })
        ));
    }
}
