//! Scripted in-memory engine for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::engine::{Engine, Sampler, TokenId};
use crate::error::EngineError;

pub(crate) const BOS: TokenId = 1_000_000;
pub(crate) const EOG: TokenId = 2_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    SizeTokenize { text: String, add_special: bool },
    FillTokenize { text: String, add_special: bool },
    Decode(Vec<TokenId>),
    Piece(TokenId),
}

/// One token per `char`, plus [`BOS`] when `add_special` is set.
pub(crate) struct MockEngine {
    pub window: usize,
    pub batch: usize,
    pub cached: usize,
    pub calls: RefCell<Vec<Call>>,
    pieces: HashMap<TokenId, Vec<u8>>,
    fail_decode_call: Option<usize>,
    fail_piece: Option<TokenId>,
    short_fill: bool,
    decode_calls: usize,
}

impl MockEngine {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            batch: usize::MAX,
            cached: 0,
            calls: RefCell::new(Vec::new()),
            pieces: HashMap::new(),
            fail_decode_call: None,
            fail_piece: None,
            short_fill: false,
            decode_calls: 0,
        }
    }

    pub fn with_cached(mut self, cached: usize) -> Self {
        self.cached = cached;
        self
    }

    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_piece(mut self, token: TokenId, piece: &str) -> Self {
        self.pieces.insert(token, piece.as_bytes().to_vec());
        self
    }

    /// Fail the `n`th decode call (0 is the prefill).
    pub fn failing_decode(mut self, n: usize) -> Self {
        self.fail_decode_call = Some(n);
        self
    }

    pub fn failing_piece(mut self, token: TokenId) -> Self {
        self.fail_piece = Some(token);
        self
    }

    pub fn with_short_fill(mut self) -> Self {
        self.short_fill = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn decodes(&self) -> Vec<Vec<TokenId>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Decode(tokens) => Some(tokens.clone()),
                _ => None,
            })
            .collect()
    }

    fn tokens(text: &str, add_special: bool) -> Vec<TokenId> {
        let mut tokens = Vec::new();
        if add_special {
            tokens.push(BOS);
        }
        tokens.extend(text.chars().map(|c| c as TokenId));
        tokens
    }
}

impl Engine for MockEngine {
    fn size_tokenize(&self, text: &str, add_special: bool) -> Result<usize, EngineError> {
        self.calls.borrow_mut().push(Call::SizeTokenize {
            text: text.to_string(),
            add_special,
        });
        Ok(Self::tokens(text, add_special).len())
    }

    fn fill_tokenize(
        &self,
        text: &str,
        add_special: bool,
        out: &mut [TokenId],
    ) -> Result<usize, EngineError> {
        self.calls.borrow_mut().push(Call::FillTokenize {
            text: text.to_string(),
            add_special,
        });
        let tokens = Self::tokens(text, add_special);
        if tokens.len() > out.len() {
            return Err(EngineError::new("output buffer too small"));
        }
        let written = if self.short_fill {
            tokens.len().saturating_sub(1)
        } else {
            tokens.len()
        };
        out[..written].copy_from_slice(&tokens[..written]);
        Ok(written)
    }

    fn decode(&mut self, tokens: &[TokenId]) -> Result<(), EngineError> {
        self.calls.borrow_mut().push(Call::Decode(tokens.to_vec()));
        let call = self.decode_calls;
        self.decode_calls += 1;
        if self.fail_decode_call == Some(call) {
            return Err(EngineError::new("decode failed"));
        }
        self.cached += tokens.len();
        Ok(())
    }

    fn token_to_piece(&self, token: TokenId) -> Result<Vec<u8>, EngineError> {
        self.calls.borrow_mut().push(Call::Piece(token));
        if self.fail_piece == Some(token) {
            return Err(EngineError::new("unknown token"));
        }
        if let Some(piece) = self.pieces.get(&token) {
            return Ok(piece.clone());
        }
        char::from_u32(token as u32)
            .map(|c| c.to_string().into_bytes())
            .ok_or_else(|| EngineError::new("not a char token"))
    }

    fn is_end_of_generation(&self, token: TokenId) -> bool {
        token == EOG
    }

    fn cached_len(&self) -> usize {
        self.cached
    }

    fn window_capacity(&self) -> usize {
        self.window
    }

    fn batch_capacity(&self) -> usize {
        self.batch
    }
}

/// Replays a fixed token sequence, then returns [`EOG`] forever.
pub(crate) struct ScriptedSampler {
    script: VecDeque<TokenId>,
    pub sampled: usize,
}

impl ScriptedSampler {
    pub fn new(script: impl IntoIterator<Item = TokenId>) -> Self {
        Self {
            script: script.into_iter().collect(),
            sampled: 0,
        }
    }

    /// Samples the characters of `text`, then end-of-generation.
    pub fn text(text: &str) -> Self {
        Self::new(text.chars().map(|c| c as TokenId))
    }
}

impl Sampler<MockEngine> for ScriptedSampler {
    fn sample(&mut self, _engine: &MockEngine) -> TokenId {
        self.sampled += 1;
        self.script.pop_front().unwrap_or(EOG)
    }
}
