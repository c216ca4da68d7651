//! [`Engine`] implementation over a llama.cpp context.

use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::{AddBos, LlamaModel};
use llama_cpp_2::token::LlamaToken;
use tracing::debug;

use kvchat_core::{Engine, EngineError, TokenId};

/// Piece buffer size handed to llama.cpp for one token.
const PIECE_BUFFER: usize = 256;

/// One llama.cpp context bound to a loaded model.
///
/// The cached position count is kept here, bumped after every successful
/// decode, rather than read back from the context's memory. It only matches
/// the transcript cursor while no decode has failed; a failed decode poisons
/// the owning `Session`, which then refuses further turns, so the count is
/// never used for budgeting after it may have drifted.
pub struct LlamaEngine<'m> {
    model: &'m LlamaModel,
    ctx: LlamaContext<'m>,
    /// Positions submitted through successful `decode` calls.
    cached: usize,
}

impl<'m> LlamaEngine<'m> {
    pub(crate) fn new(model: &'m LlamaModel, ctx: LlamaContext<'m>) -> Self {
        Self {
            model,
            ctx,
            cached: 0,
        }
    }

    pub fn context(&self) -> &LlamaContext<'m> {
        &self.ctx
    }

    fn tokens(&self, text: &str, add_special: bool) -> Result<Vec<LlamaToken>, EngineError> {
        let add_bos = if add_special {
            AddBos::Always
        } else {
            AddBos::Never
        };
        self.model
            .str_to_token(text, add_bos)
            .map_err(|e| EngineError::new(e.to_string()))
    }
}

impl Engine for LlamaEngine<'_> {
    fn size_tokenize(&self, text: &str, add_special: bool) -> Result<usize, EngineError> {
        Ok(self.tokens(text, add_special)?.len())
    }

    fn fill_tokenize(
        &self,
        text: &str,
        add_special: bool,
        out: &mut [TokenId],
    ) -> Result<usize, EngineError> {
        let tokens = self.tokens(text, add_special)?;
        if tokens.len() > out.len() {
            return Err(EngineError::new(format!(
                "token buffer holds {} tokens, {} needed",
                out.len(),
                tokens.len()
            )));
        }
        for (slot, token) in out.iter_mut().zip(&tokens) {
            *slot = token.0;
        }
        Ok(tokens.len())
    }

    fn decode(&mut self, tokens: &[TokenId]) -> Result<(), EngineError> {
        let tokens: Vec<LlamaToken> = tokens.iter().copied().map(LlamaToken).collect();
        let mut batch =
            LlamaBatch::get_one(&tokens).map_err(|e| EngineError::new(e.to_string()))?;
        self.ctx
            .decode(&mut batch)
            .map_err(|e| EngineError::new(e.to_string()))?;
        self.cached += tokens.len();
        Ok(())
    }

    fn token_to_piece(&self, token: TokenId) -> Result<Vec<u8>, EngineError> {
        self.model
            .token_to_piece_bytes(LlamaToken(token), PIECE_BUFFER, true, None)
            .map_err(|e| EngineError::new(e.to_string()))
    }

    fn is_end_of_generation(&self, token: TokenId) -> bool {
        self.model.is_eog_token(LlamaToken(token))
    }

    fn cached_len(&self) -> usize {
        self.cached
    }

    fn window_capacity(&self) -> usize {
        self.ctx.n_ctx() as usize
    }

    fn batch_capacity(&self) -> usize {
        self.ctx.n_batch() as usize
    }
}

impl Drop for LlamaEngine<'_> {
    fn drop(&mut self) {
        debug!(cached = self.cached, "releasing llama context");
    }
}
