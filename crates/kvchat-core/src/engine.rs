//! Capabilities required of the text-generation engine.
//!
//! The session never loads models or owns tokenizer internals. It drives any
//! type implementing [`Engine`], and picks tokens through a pluggable
//! [`Sampler`].

use crate::error::EngineError;

/// Vocabulary token id as understood by the engine.
pub type TokenId = i32;

/// Window, batch and threading parameters used when creating an engine context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextParams {
    /// Maximum number of cached positions.
    pub window_capacity: u32,
    /// Largest number of tokens submitted in one decode call.
    pub batch_size: u32,
    /// Threads used for evaluation.
    pub thread_count: u32,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            window_capacity: 2048,
            batch_size: 2048,
            thread_count: 4,
        }
    }
}

/// An autoregressive engine with a per-position context cache.
pub trait Engine {
    /// Number of tokens `text` produces. First pass of the size-then-fill
    /// protocol.
    fn size_tokenize(&self, text: &str, add_special: bool) -> Result<usize, EngineError>;

    /// Writes the tokens of `text` into `out` and returns how many were
    /// written. Must be called with the same arguments as the size pass.
    fn fill_tokenize(
        &self,
        text: &str,
        add_special: bool,
        out: &mut [TokenId],
    ) -> Result<usize, EngineError>;

    /// Evaluates `tokens` as one batch, extending the context cache.
    fn decode(&mut self, tokens: &[TokenId]) -> Result<(), EngineError>;

    /// Raw bytes of the token's text. May be a partial UTF-8 sequence.
    fn token_to_piece(&self, token: TokenId) -> Result<Vec<u8>, EngineError>;

    /// Whether `token` is an end-of-generation sentinel.
    fn is_end_of_generation(&self, token: TokenId) -> bool;

    /// Number of positions currently held in the context cache.
    fn cached_len(&self) -> usize;

    /// Fixed capacity of the context window.
    fn window_capacity(&self) -> usize;

    /// Largest token count accepted by a single [`decode`](Self::decode).
    fn batch_capacity(&self) -> usize {
        usize::MAX
    }
}

/// Picks the next token from the engine's current state.
pub trait Sampler<E: Engine + ?Sized> {
    fn sample(&mut self, engine: &E) -> TokenId;
}
