//! # kvchat core
//!
//! Turn-based chat on top of an autoregressive engine with a per-position
//! context cache. Only the unseen suffix of the transcript is submitted each
//! turn.
//!
//! ## Turn pipeline
//!
//! ```text
//! ┌────────────┐   ┌───────┐   ┌──────────┐   ┌────────┐   ┌────────────┐
//! │ Transcript │-->│ Delta │-->│ Tokenize │-->│ Budget │-->│ Generation │
//! └────────────┘   └───────┘   └──────────┘   └────────┘   └────────────┘
//!       ^                                                        │
//!       └──────────────── commit (append + cursor) ──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use kvchat_core::{Session, SessionConfig};
//!
//! let mut session = Session::new(engine, sampler, SessionConfig::default());
//! let report = session.turn("Hello there", &mut std::io::stdout())?;
//! ```

mod budget;
mod config;
mod engine;
mod error;
mod generate;
mod response;
mod session;
#[cfg(test)]
mod testing;
mod tokenize;
mod transcript;

pub use budget::ContextBudget;
pub use config::{SessionConfig, SessionConfigBuilder};
pub use engine::{ContextParams, Engine, Sampler, TokenId};
pub use error::{ConfigError, EngineError, TurnError};
pub use generate::{Generation, GenerationLoop, StopReason};
pub use response::{Append, ResponseBuffer, DEFAULT_RESPONSE_CAPACITY};
pub use session::{
    Input, LineSource, Session, SessionEnd, SessionError, TurnReport, EXIT_COMMAND,
};
pub use tokenize::{tokenize, MAX_TOKENIZE_BYTES};
pub use transcript::{
    Delta, PendingTurn, Transcript, ASSISTANT_TURN_OPEN, TURN_CLOSE, USER_TURN_OPEN,
};
