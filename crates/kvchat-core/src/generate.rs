//! Bounded generation loop.
//!
//! One batched prefill of the delta tokens, then single-token
//! sample/convert/decode steps until the model emits an end-of-generation
//! token or the iteration budget runs out. Any engine failure ends the loop
//! immediately; nothing is retried.

use std::io::Write;

use tracing::{debug, warn};

use crate::engine::{Engine, Sampler, TokenId};
use crate::error::TurnError;
use crate::response::{Append, ResponseBuffer};

/// Why a successful generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model sampled its end-of-generation token.
    EndOfGeneration,
    /// The iteration budget ran out. The reply is capped, not failed.
    BudgetExhausted,
}

/// Output of a completed generation.
#[derive(Debug)]
pub struct Generation {
    pub stop: StopReason,
    /// Tokens sampled, streamed and decoded. Excludes the end-of-generation
    /// token.
    pub generated: usize,
    pub response: ResponseBuffer,
    /// Times the overflow warning was logged: 0 or 1.
    pub truncation_warnings: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Prefill,
    Decoding,
    Stopped(StopReason),
}

/// Drives one turn's generation against an engine and sampler.
pub struct GenerationLoop<'a, E: ?Sized, S: ?Sized> {
    engine: &'a mut E,
    sampler: &'a mut S,
    max_tokens: usize,
    response_capacity: usize,
}

impl<'a, E, S> GenerationLoop<'a, E, S>
where
    E: Engine + ?Sized,
    S: Sampler<E> + ?Sized,
{
    pub fn new(engine: &'a mut E, sampler: &'a mut S) -> Self {
        Self {
            engine,
            sampler,
            max_tokens: 0,
            response_capacity: crate::response::DEFAULT_RESPONSE_CAPACITY,
        }
    }

    /// Maximum number of decode iterations after the prefill.
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn response_capacity(mut self, capacity: usize) -> Self {
        self.response_capacity = capacity;
        self
    }

    /// Prefill `prompt`, then generate, streaming every piece to `out`.
    pub fn run(self, prompt: &[TokenId], out: &mut dyn Write) -> Result<Generation, TurnError> {
        let mut response = ResponseBuffer::new(self.response_capacity);
        let mut generated = 0;
        let mut truncation_warnings = 0;
        let mut phase = Phase::Prefill;

        loop {
            phase = match phase {
                Phase::Prefill => {
                    debug!(tokens = prompt.len(), "prefill");
                    self.engine
                        .decode(prompt)
                        .map_err(TurnError::PrefillFailed)?;
                    Phase::Decoding
                }
                Phase::Decoding if generated == self.max_tokens => {
                    Phase::Stopped(StopReason::BudgetExhausted)
                }
                Phase::Decoding => {
                    let token = self.sampler.sample(&*self.engine);
                    if self.engine.is_end_of_generation(token) {
                        Phase::Stopped(StopReason::EndOfGeneration)
                    } else {
                        let piece = self
                            .engine
                            .token_to_piece(token)
                            .map_err(|source| TurnError::PieceConversionFailed { token, source })?;

                        if response.push(&piece) == Append::Truncated {
                            truncation_warnings += 1;
                            warn!(
                                capacity = response.capacity(),
                                "assistant response buffer full; continuing stream without storing full text"
                            );
                        }
                        stream(out, &piece);

                        self.engine
                            .decode(&[token])
                            .map_err(TurnError::DecodeFailed)?;
                        generated += 1;
                        Phase::Decoding
                    }
                }
                Phase::Stopped(stop) => {
                    debug!(?stop, generated, stored = response.len(), "generation stopped");
                    return Ok(Generation {
                        stop,
                        generated,
                        response,
                        truncation_warnings,
                    });
                }
            };
        }
    }
}

fn stream(out: &mut dyn Write, piece: &[u8]) {
    if let Err(e) = out.write_all(piece).and_then(|()| out.flush()) {
        debug!("dropping streamed piece: {}", e);
    }
}
