//! Greedy sampling through llama.cpp's sampler chain.

use llama_cpp_2::sampling::LlamaSampler;

use kvchat_core::{Sampler, TokenId};

use crate::engine::LlamaEngine;

/// Always picks the highest-probability token.
pub struct GreedySampler {
    inner: LlamaSampler,
}

impl GreedySampler {
    pub fn new() -> Self {
        Self {
            inner: LlamaSampler::greedy(),
        }
    }
}

impl Default for GreedySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m> Sampler<LlamaEngine<'m>> for GreedySampler {
    fn sample(&mut self, engine: &LlamaEngine<'m>) -> TokenId {
        // Logits of the last evaluated token.
        self.inner.sample(engine.context(), -1).0
    }
}
