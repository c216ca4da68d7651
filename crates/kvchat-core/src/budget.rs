//! Context window accounting.

use crate::error::TurnError;

/// Positions available for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Positions already cached by the engine.
    pub cached: usize,
    /// Tokens in the delta about to be prefilled.
    pub new: usize,
    /// Window capacity.
    pub window: usize,
}

impl ContextBudget {
    pub fn new(cached: usize, new: usize, window: usize) -> Self {
        Self { cached, new, window }
    }

    /// Number of tokens that may be generated after prefilling the delta.
    ///
    /// Filling the window exactly counts as exhaustion, since it leaves no
    /// position for even one generated token.
    pub fn max_generatable(&self) -> Result<usize, TurnError> {
        let occupied = self.cached.saturating_add(self.new);
        if occupied >= self.window {
            return Err(TurnError::ContextExhausted {
                cached: self.cached,
                new: self.new,
                window: self.window,
            });
        }

        match self.window - occupied {
            0 => Err(TurnError::NoGenerationRoom),
            room => Ok(room),
        }
    }

    /// Like [`max_generatable`](Self::max_generatable), lowered to `cap` when
    /// a per-turn token limit is configured.
    pub fn iteration_budget(&self, cap: Option<usize>) -> Result<usize, TurnError> {
        let room = self.max_generatable()?;
        Ok(cap.map_or(room, |cap| room.min(cap)))
    }
}
