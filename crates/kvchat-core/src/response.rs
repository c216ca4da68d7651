//! Capacity-bounded accumulator for the assistant reply.

use std::borrow::Cow;

/// Default number of reply bytes kept for the transcript.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 4096;

/// Result of pushing one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// Stored in full.
    Stored,
    /// First fragment that did not fit. The buffer is now truncated.
    Truncated,
    /// Dropped because the buffer was already truncated.
    Dropped,
}

/// Reply bytes up to a fixed capacity.
///
/// Truncation is sticky: once one fragment is dropped every later fragment is
/// dropped too, so the stored bytes are always a prefix of the generated
/// output.
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    bytes: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl ResponseBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity,
            truncated: false,
        }
    }

    pub fn push(&mut self, fragment: &[u8]) -> Append {
        if self.truncated {
            return Append::Dropped;
        }
        if self.bytes.len() + fragment.len() <= self.capacity {
            self.bytes.extend_from_slice(fragment);
            Append::Stored
        } else {
            self.truncated = true;
            Append::Truncated
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Stored bytes as text. A multi-byte character cut at the truncation
    /// point becomes U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_CAPACITY)
    }
}
