//! Chat session: exclusive owner of the engine, the sampler and the
//! transcript.
//!
//! A turn runs delta extraction, tokenization, the budget check and the
//! generation loop, and only then commits to the transcript. Every check that
//! can fail before prefill runs before the engine sees a single token.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::budget::ContextBudget;
use crate::config::SessionConfig;
use crate::engine::{Engine, Sampler};
use crate::error::TurnError;
use crate::generate::{GenerationLoop, StopReason};
use crate::tokenize::tokenize;
use crate::transcript::{PendingTurn, Transcript};

/// Line that ends the session.
pub const EXIT_COMMAND: &str = "exit";

/// Source of user input, one line per call.
pub trait LineSource {
    /// Next line including its terminator, or `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// How a user line is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Exit,
    Blank,
    Text(&'a str),
}

impl<'a> Input<'a> {
    /// Classify a raw line. The line terminator is not part of the text.
    pub fn parse(line: &'a str) -> Self {
        let text = line.strip_suffix('\n').unwrap_or(line);
        let text = text.strip_suffix('\r').unwrap_or(text);
        if text == EXIT_COMMAND {
            Input::Exit
        } else if text.trim().is_empty() {
            Input::Blank
        } else {
            Input::Text(text)
        }
    }
}

/// Accounting for one committed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    pub stop: StopReason,
    pub prompt_tokens: usize,
    pub generated_tokens: usize,
    pub response_bytes: usize,
    pub truncated: bool,
    /// Overflow warnings logged while generating. At most one.
    pub truncation_warnings: usize,
}

/// Why [`Session::run`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `exit`.
    Exit,
    /// The line source ran dry.
    EndOfInput,
}

/// Errors that end a session loop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),

    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// A conversation bound to one engine context.
///
/// Dropping the session releases the engine and sampler, whichever path
/// ended it. A turn that fails after prefill poisons the session: the engine
/// cache no longer matches the transcript cursor, so every later turn fails
/// with [`TurnError::SessionPoisoned`] without touching the engine.
pub struct Session<E, S> {
    engine: E,
    sampler: S,
    transcript: Transcript,
    config: SessionConfig,
    poisoned: bool,
}

impl<E, S> Session<E, S>
where
    E: Engine,
    S: Sampler<E>,
{
    /// Create a session with an empty transcript.
    pub fn new(engine: E, sampler: S, config: SessionConfig) -> Self {
        Self {
            engine,
            sampler,
            transcript: Transcript::new(),
            config,
            poisoned: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether an earlier turn failed after the engine saw its tokens.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Run one turn for `user_text`, streaming the reply to `out`.
    ///
    /// On error the transcript and its cursor are unchanged.
    pub fn turn(&mut self, user_text: &str, out: &mut dyn Write) -> Result<TurnReport, TurnError> {
        if self.poisoned {
            return Err(TurnError::SessionPoisoned);
        }
        let result = self.try_turn(user_text, out);
        if let Err(e) = &result {
            if !e.is_recoverable() {
                warn!("engine cache diverged from transcript: {}", e);
                self.poisoned = true;
            }
        }
        result
    }

    fn try_turn(&mut self, user_text: &str, out: &mut dyn Write) -> Result<TurnReport, TurnError> {
        let pending = PendingTurn::new(user_text);

        let tokens = {
            let delta = self.transcript.compute_delta(&pending)?;
            debug!(
                unseen = delta.unseen.len(),
                pending = delta.pending.len(),
                add_special = delta.add_special,
                "delta"
            );
            tokenize(&self.engine, &delta.text(), delta.add_special)?
        };
        if tokens.is_empty() {
            return Err(TurnError::NoPromptTokens);
        }

        let budget = ContextBudget::new(
            self.engine.cached_len(),
            tokens.len(),
            self.engine.window_capacity(),
        );
        let max_tokens = budget.iteration_budget(self.config.max_new_tokens)?;

        let batch = self.engine.batch_capacity();
        if tokens.len() > batch {
            return Err(TurnError::BatchTooLarge {
                tokens: tokens.len(),
                batch,
            });
        }

        debug!(
            cached = budget.cached,
            new = budget.new,
            window = budget.window,
            max_tokens,
            "context budget"
        );

        let generation = GenerationLoop::new(&mut self.engine, &mut self.sampler)
            .max_tokens(max_tokens)
            .response_capacity(self.config.response_capacity)
            .run(&tokens, out)?;

        if let Err(e) = out.write_all(b"\n").and_then(|()| out.flush()) {
            debug!("failed to end streamed reply: {}", e);
        }

        let report = TurnReport {
            stop: generation.stop,
            prompt_tokens: budget.new,
            generated_tokens: generation.generated,
            response_bytes: generation.response.len(),
            truncated: generation.response.is_truncated(),
            truncation_warnings: generation.truncation_warnings,
        };

        self.transcript.commit(pending, &generation.response.text());
        debug!(
            cursor = self.transcript.cursor(),
            len = self.transcript.len(),
            ?report,
            "turn committed"
        );

        Ok(report)
    }

    /// Read lines and run turns until `exit`, end of input or a fatal error.
    pub fn run(
        &mut self,
        lines: &mut dyn LineSource,
        out: &mut dyn Write,
    ) -> Result<SessionEnd, SessionError> {
        while let Some(line) = lines.read_line()? {
            let text = match Input::parse(&line) {
                Input::Exit => return Ok(SessionEnd::Exit),
                Input::Blank => continue,
                Input::Text(text) => text,
            };

            match self.turn(text, out) {
                Ok(_) => {}
                Err(e) if e.is_recoverable() && self.config.recover_turn_errors => {
                    warn!("turn discarded: {}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(SessionEnd::EndOfInput)
    }
}
