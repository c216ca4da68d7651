//! Error types for turns, engine calls and configuration.

use thiserror::Error;

/// A failed call into the generation engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that abort a single turn.
///
/// None of these ever leave a partial mutation in the transcript.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("invalid KV cache cursor {cursor} (transcript length {len})")]
    InvalidCursor { cursor: usize, len: usize },

    #[error("prompt segment of {len} bytes is too large to tokenize")]
    TokenizeTooLarge { len: usize },

    #[error("failed to tokenize the prompt: {0}")]
    TokenizeFailed(#[source] EngineError),

    #[error("tokenizer wrote {written} tokens, expected {expected}")]
    TokenizeMismatch { expected: usize, written: usize },

    #[error("no new prompt tokens to evaluate")]
    NoPromptTokens,

    #[error("context window exhausted (cached={cached}, new_prompt={new}, n_ctx={window})")]
    ContextExhausted {
        cached: usize,
        new: usize,
        window: usize,
    },

    #[error("no room left to generate response tokens")]
    NoGenerationRoom,

    #[error("prompt of {tokens} tokens does not fit in one batch of {batch}")]
    BatchTooLarge { tokens: usize, batch: usize },

    #[error("failed to evaluate prompt batch: {0}")]
    PrefillFailed(#[source] EngineError),

    #[error("failed to evaluate generation batch: {0}")]
    DecodeFailed(#[source] EngineError),

    #[error("failed to convert token {token} to text: {source}")]
    PieceConversionFailed {
        token: i32,
        #[source]
        source: EngineError,
    },

    #[error("session is no longer usable: an earlier turn failed after prefill")]
    SessionPoisoned,
}

impl TurnError {
    /// Whether the session can continue after this error.
    ///
    /// Errors raised before prefill leave the engine cache untouched. Once
    /// tokens were submitted the cache may hold positions the transcript never
    /// recorded, so those errors end the session.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TurnError::InvalidCursor { .. }
            | TurnError::TokenizeTooLarge { .. }
            | TurnError::TokenizeFailed(_)
            | TurnError::TokenizeMismatch { .. }
            | TurnError::NoPromptTokens
            | TurnError::ContextExhausted { .. }
            | TurnError::NoGenerationRoom
            | TurnError::BatchTooLarge { .. } => true,
            TurnError::PrefillFailed(_)
            | TurnError::DecodeFailed(_)
            | TurnError::PieceConversionFailed { .. }
            | TurnError::SessionPoisoned => false,
        }
    }
}

/// Invalid session configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("context window capacity must be greater than zero")]
    ZeroWindow,

    #[error("batch size must be greater than zero")]
    ZeroBatch,

    #[error("batch size {batch} exceeds context window capacity {window}")]
    BatchExceedsWindow { batch: u32, window: u32 },

    #[error("thread count must be greater than zero")]
    ZeroThreads,

    #[error("response capacity must be greater than zero")]
    ZeroResponseCapacity,

    #[error("per-turn token cap must be greater than zero")]
    ZeroTokenCap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_prefill_errors_are_recoverable() {
        assert!(TurnError::NoPromptTokens.is_recoverable());
        assert!(TurnError::ContextExhausted {
            cached: 2000,
            new: 50,
            window: 2048
        }
        .is_recoverable());
        assert!(TurnError::InvalidCursor { cursor: 5, len: 3 }.is_recoverable());
    }

    #[test]
    fn test_engine_errors_are_fatal() {
        let err = EngineError::new("llama_decode returned 1");
        assert!(!TurnError::PrefillFailed(err.clone()).is_recoverable());
        assert!(!TurnError::DecodeFailed(err.clone()).is_recoverable());
        assert!(!TurnError::PieceConversionFailed {
            token: 7,
            source: err
        }
        .is_recoverable());
        assert!(!TurnError::SessionPoisoned.is_recoverable());
    }

    #[test]
    fn test_context_exhausted_message() {
        let err = TurnError::ContextExhausted {
            cached: 2000,
            new: 50,
            window: 2048,
        };
        assert_eq!(
            err.to_string(),
            "context window exhausted (cached=2000, new_prompt=50, n_ctx=2048)"
        );
    }
}
