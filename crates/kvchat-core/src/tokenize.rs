//! Tokenizer bridge.
//!
//! The engine wants pre-sized output storage, so tokenization is a size pass
//! followed by a fill pass with identical arguments. Callers only ever see
//! [`tokenize`], which returns a ready token buffer.

use tracing::trace;

use crate::engine::{Engine, TokenId};
use crate::error::TurnError;

/// Largest text the engine's `i32` length type can describe.
pub const MAX_TOKENIZE_BYTES: usize = i32::MAX as usize;

/// Tokenize `text` with the size-then-fill protocol.
pub fn tokenize<E: Engine + ?Sized>(
    engine: &E,
    text: &str,
    add_special: bool,
) -> Result<Vec<TokenId>, TurnError> {
    if text.len() > MAX_TOKENIZE_BYTES {
        return Err(TurnError::TokenizeTooLarge { len: text.len() });
    }

    let expected = engine
        .size_tokenize(text, add_special)
        .map_err(TurnError::TokenizeFailed)?;
    if expected == 0 {
        return Ok(Vec::new());
    }

    let mut tokens = vec![0; expected];
    let written = engine
        .fill_tokenize(text, add_special, &mut tokens)
        .map_err(TurnError::TokenizeFailed)?;
    if written != expected {
        return Err(TurnError::TokenizeMismatch { expected, written });
    }

    trace!(bytes = text.len(), tokens = expected, add_special, "tokenized delta");
    Ok(tokens)
}
